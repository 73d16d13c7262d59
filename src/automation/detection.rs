use anyhow::{anyhow, Result};
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, integral_squared_image};
use imageproc::template_matching::{match_template_parallel, MatchTemplateMethod};
use log::{debug, error, info, warn, Level};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

use crate::automation::context::AutomationContext;
use crate::core::coords::{resolve_region, PixelRect};
use crate::scenes::registry::Element;

/// Outcome of probing one element during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Detection {
    pub present: bool,
    /// Center of the best match in screen pixels, set only when present
    pub point: Option<(u32, u32)>,
    /// Best match score, when matching ran at all
    pub score: Option<f32>,
}

impl Detection {
    pub fn absent() -> Self {
        Self::default()
    }
}

/// Per-cycle detection results keyed by element name.
pub type Readings = HashMap<String, Detection>;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("template {} could not be loaded: {source}", .path.display())]
    TemplateMissing {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("search region {region} for '{element}' is smaller than its {}x{} template", .template.0, .template.1)]
    RegionTooSmall {
        element: String,
        region: PixelRect,
        template: (u32, u32),
    },
    #[error("detection failed: {0:#}")]
    DetectionFault(anyhow::Error),
}

impl From<anyhow::Error> for DetectError {
    fn from(e: anyhow::Error) -> Self {
        DetectError::DetectionFault(e)
    }
}

impl DetectError {
    /// Level the failure is reported at before it is treated as absent.
    pub fn level(&self) -> Level {
        match self {
            DetectError::RegionTooSmall { .. } => Level::Warn,
            DetectError::TemplateMissing { .. } | DetectError::DetectionFault(_) => Level::Error,
        }
    }
}

/// Best score and top-left position of a template within a haystack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchHit {
    pub score: f32,
    pub top_left: (u32, u32),
}

pub trait TemplateMatcher {
    fn best_match(&self, haystack: &GrayImage, template: &GrayImage) -> Result<MatchHit>;
}

/// Mean-subtracted normalized cross-correlation, in `[-1, 1]`.
///
/// Windows or templates with no variance score 0.
#[derive(Default)]
pub struct NccMatcher;

type Integral = ImageBuffer<Luma<u64>, Vec<u64>>;

/// Sum over the `w` x `h` window at `(x, y)` of an integral image.
fn window_sum(integral: &Integral, x: u32, y: u32, w: u32, h: u32) -> u64 {
    let at = |x, y| integral.get_pixel(x, y)[0];
    at(x + w, y + h) + at(x, y) - at(x, y + h) - at(x + w, y)
}

impl TemplateMatcher for NccMatcher {
    fn best_match(&self, haystack: &GrayImage, template: &GrayImage) -> Result<MatchHit> {
        let (tpl_w, tpl_h) = template.dimensions();
        let (hay_w, hay_h) = haystack.dimensions();
        if tpl_w == 0 || tpl_h == 0 || tpl_w > hay_w || tpl_h > hay_h {
            return Err(anyhow!(
                "template {}x{} does not fit in a {}x{} search image",
                tpl_w,
                tpl_h,
                hay_w,
                hay_h
            ));
        }

        let n = u64::from(tpl_w) * u64::from(tpl_h);
        let tpl_mean = template.pixels().map(|p| f64::from(p[0])).sum::<f64>() / n as f64;
        let tpl_norm = template
            .pixels()
            .map(|p| (f64::from(p[0]) - tpl_mean).powi(2))
            .sum::<f64>()
            .sqrt();

        // sum(I * T) per window; the template mean is taken out below
        let products = match_template_parallel(haystack, template, MatchTemplateMethod::CrossCorrelation);
        let sums: Integral = integral_image::<_, u64>(haystack);
        let squares: Integral = integral_squared_image::<_, u64>(haystack);

        let mut best = MatchHit {
            score: f32::NEG_INFINITY,
            top_left: (0, 0),
        };
        for (x, y, product) in products.enumerate_pixels() {
            let sum = window_sum(&sums, x, y, tpl_w, tpl_h);
            let sum_sq = window_sum(&squares, x, y, tpl_w, tpl_h);
            // n * sum((I - mean)^2), exact in integers
            let spread = u128::from(n) * u128::from(sum_sq) - u128::from(sum) * u128::from(sum);

            let score = if spread == 0 || tpl_norm == 0.0 {
                0.0
            } else {
                let numerator = f64::from(product[0]) - tpl_mean * sum as f64;
                let window_norm = (spread as f64 / n as f64).sqrt();
                (numerator / (window_norm * tpl_norm)).clamp(-1.0, 1.0) as f32
            };
            if score > best.score {
                best = MatchHit { score, top_left: (x, y) };
            }
        }
        Ok(best)
    }
}

/// Reference images decoded once per path. Failed loads are retried next time.
#[derive(Default)]
pub struct TemplateLibrary {
    cache: HashMap<PathBuf, Rc<GrayImage>>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, path: &Path) -> Result<Rc<GrayImage>, DetectError> {
        if let Some(template) = self.cache.get(path) {
            return Ok(Rc::clone(template));
        }
        let template = image::open(path)
            .map_err(|source| DetectError::TemplateMissing {
                path: path.to_path_buf(),
                source,
            })?
            .to_luma8();
        let template = Rc::new(template);
        self.cache.insert(path.to_path_buf(), Rc::clone(&template));
        Ok(template)
    }

    #[cfg(test)]
    pub fn insert(&mut self, path: impl Into<PathBuf>, template: GrayImage) {
        self.cache.insert(path.into(), Rc::new(template));
    }
}

impl AutomationContext {
    /// Look for `element` on screen. Present only when the best score is
    /// strictly above `confidence`.
    pub fn detect(&mut self, element: &Element, confidence: f32) -> Result<Detection, DetectError> {
        let template = self.templates.get(&element.template)?;
        let (tpl_w, tpl_h) = template.dimensions();

        let screen = self.screen_size()?;
        let region = element
            .region
            .map(|rel| resolve_region(&rel, screen, self.region_margin));
        let bounds = region.unwrap_or_else(|| PixelRect::full(screen));

        if bounds.width() < tpl_w || bounds.height() < tpl_h {
            return Err(DetectError::RegionTooSmall {
                element: element.name.clone(),
                region: bounds,
                template: (tpl_w, tpl_h),
            });
        }

        let frame = self.screen.capture(region)?;
        let haystack = image::imageops::grayscale(&frame);
        if haystack.width() < tpl_w || haystack.height() < tpl_h {
            return Err(DetectError::RegionTooSmall {
                element: element.name.clone(),
                region: bounds,
                template: (tpl_w, tpl_h),
            });
        }

        let hit = self.matcher.best_match(&haystack, &template)?;
        if hit.score > confidence {
            let point = (
                bounds.left + hit.top_left.0 + tpl_w / 2,
                bounds.top + hit.top_left.1 + tpl_h / 2,
            );
            info!(
                "Found {} score {:.2} at ({}, {})",
                element.name, hit.score, point.0, point.1
            );
            Ok(Detection {
                present: true,
                point: Some(point),
                score: Some(hit.score),
            })
        } else {
            debug!("{} not found, best score {:.2}", element.name, hit.score);
            Ok(Detection {
                present: false,
                point: None,
                score: Some(hit.score),
            })
        }
    }

    /// Detect `element`, reporting any failure and treating it as absent.
    pub fn probe(&mut self, element: &Element, confidence: f32) -> Detection {
        match self.detect(element, confidence) {
            Ok(detection) => detection,
            Err(e) => {
                match e.level() {
                    Level::Warn => warn!("{}: {}", element.name, e),
                    _ => error!("{}: {}", element.name, e),
                }
                Detection::absent()
            }
        }
    }
}

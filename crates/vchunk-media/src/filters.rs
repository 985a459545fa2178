//! Vertical-format filter graphs.
//!
//! [`build_transform`] turns a policy and the probed source geometry into a
//! [`TransformDescriptor`] once per file. The descriptor is rendered to an
//! FFmpeg `-filter_complex` graph by [`video_filter_graph`] for every chunk.
//!
//! All graphs read `[0:v]` and write `[vout]`.

use serde::{Deserialize, Serialize};

use vchunk_models::{TransformDescriptor, TransformPolicy};

use crate::error::{MediaError, MediaResult};

/// Output label shared by every graph.
pub const VIDEO_OUT_LABEL: &str = "[vout]";

/// Rendering knobs that do not affect geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Background blur sigma for the blur composite (default: 30.0).
    pub blur_sigma: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { blur_sigma: 30.0 }
    }
}

/// Fade-out applied at the tail of a chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeOut {
    /// Offset into the chunk where the fade begins, in seconds
    pub start: f64,
    /// Fade length in seconds
    pub duration: f64,
}

impl FadeOut {
    /// Fade of `fade_secs` ending at `chunk_duration`.
    ///
    /// `None` when the chunk is not longer than the fade itself.
    pub fn at_tail(chunk_duration: f64, fade_secs: f64) -> Option<Self> {
        (fade_secs > 0.0 && chunk_duration > fade_secs).then(|| Self {
            start: chunk_duration - fade_secs,
            duration: fade_secs,
        })
    }

    fn video(&self) -> String {
        format!("fade=t=out:st={:.3}:d={:.3}", self.start, self.duration)
    }

    /// Audio filter matching the video fade.
    pub fn audio_filter(&self) -> String {
        format!("afade=t=out:st={:.3}:d={:.3}", self.start, self.duration)
    }
}

/// Compute the per-file transform for `policy`.
///
/// Pure geometry, no I/O. `Ok(None)` means pass-through. Errors with
/// [`MediaError::InvalidGeometry`] when:
///
/// - crop: the source is narrower than the output aspect ratio;
/// - pad, blur composite: the source scaled to the output width is taller
///   than the output. The foreground is only ever fit by width, so such a
///   source would spill past the frame instead of being pillarboxed.
pub fn build_transform(
    policy: TransformPolicy,
    src_w: u32,
    src_h: u32,
    out_w: u32,
    out_h: u32,
) -> MediaResult<Option<TransformDescriptor>> {
    let invalid = |reason: &str| {
        MediaError::invalid_geometry(policy, (src_w, src_h), (out_w, out_h), reason)
    };

    let descriptor = match policy {
        TransformPolicy::None => return Ok(None),
        _ if src_w == 0 || src_h == 0 || out_w == 0 || out_h == 0 => {
            return Err(invalid("dimensions must be non-zero"));
        }
        TransformPolicy::Crop => {
            let exact_w = f64::from(src_h) * f64::from(out_w) / f64::from(out_h);
            if exact_w > f64::from(src_w) {
                return Err(invalid("source is narrower than the output aspect ratio"));
            }
            let target_w = fit_even(exact_w, src_w);
            if target_w == 0 {
                return Err(invalid("crop width rounds to zero"));
            }
            TransformDescriptor::Crop {
                target_w,
                target_h: src_h,
                x_offset: (src_w - target_w) / 2,
                out_w,
                out_h,
            }
        }
        TransformPolicy::Pad | TransformPolicy::BlurComposite => {
            let scaled_h = fitted_height(src_w, src_h, out_w, out_h).ok_or_else(|| {
                invalid("source is taller than the output aspect ratio")
            })?;
            let y_offset = (out_h - scaled_h) / 2;
            if policy == TransformPolicy::Pad {
                TransformDescriptor::Pad {
                    scaled_w: out_w,
                    scaled_h,
                    y_offset,
                    out_w,
                    out_h,
                }
            } else {
                TransformDescriptor::BlurComposite {
                    out_w,
                    out_h,
                    scaled_h,
                    y_offset,
                }
            }
        }
    };

    Ok(Some(descriptor))
}

/// Height of the source scaled to `out_w`, even and within `out_h`.
fn fitted_height(src_w: u32, src_h: u32, out_w: u32, out_h: u32) -> Option<u32> {
    let exact_h = f64::from(src_h) * f64::from(out_w) / f64::from(src_w);
    if exact_h > f64::from(out_h) {
        return None;
    }
    match fit_even(exact_h, out_h) {
        0 => None,
        h => Some(h),
    }
}

/// Round to the nearest even integer without exceeding `bound`.
///
/// libx264 rejects odd frame dimensions.
fn fit_even(value: f64, bound: u32) -> u32 {
    let even = ((value / 2.0).round() * 2.0) as u32;
    if even > bound {
        bound - bound % 2
    } else {
        even
    }
}

/// Render a transform (and optional fade) as a `-filter_complex` graph.
///
/// `None` when neither is requested, i.e. the video stream passes through.
pub fn video_filter_graph(
    transform: Option<&TransformDescriptor>,
    options: &RenderOptions,
    fade: Option<FadeOut>,
) -> Option<String> {
    let mut graph = match transform {
        Some(descriptor) => transform_graph(descriptor, options),
        None if fade.is_some() => "[0:v]null".to_string(),
        None => return None,
    };

    if let Some(fade) = fade {
        graph.push(',');
        graph.push_str(&fade.video());
    }
    graph.push_str(VIDEO_OUT_LABEL);
    Some(graph)
}

/// Graph body for a descriptor, without the output label.
fn transform_graph(descriptor: &TransformDescriptor, options: &RenderOptions) -> String {
    match *descriptor {
        TransformDescriptor::Crop {
            target_w,
            target_h,
            x_offset,
            out_w,
            out_h,
        } => format!(
            "[0:v]crop={target_w}:{target_h}:{x_offset}:0,\
             scale={out_w}:{out_h}:flags=lanczos,setsar=1"
        ),
        TransformDescriptor::Pad {
            scaled_w,
            scaled_h,
            y_offset,
            out_w,
            out_h,
        } => format!(
            "[0:v]scale={scaled_w}:{scaled_h}:flags=lanczos,\
             pad={out_w}:{out_h}:(ow-iw)/2:{y_offset}:color=black,setsar=1"
        ),
        TransformDescriptor::BlurComposite {
            out_w,
            out_h,
            scaled_h,
            y_offset,
        } => format!(
            // Background: cover the frame, crop the excess, blur.
            // Foreground: fit to width, centered vertically.
            "[0:v]split=2[bgsrc][fgsrc];\
             [bgsrc]scale={out_w}:{out_h}:force_original_aspect_ratio=increase,\
             crop={out_w}:{out_h},gblur=sigma={blur}[bg];\
             [fgsrc]scale={out_w}:{scaled_h}:flags=lanczos[fg];\
             [bg][fg]overlay=0:{y_offset},setsar=1",
            blur = options.blur_sigma,
        ),
    }
}

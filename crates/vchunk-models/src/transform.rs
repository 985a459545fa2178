//! Vertical-format transform policies and the descriptors built from them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default output width for 9:16 portrait output.
pub const PORTRAIT_WIDTH: u32 = 1080;
/// Default output height for 9:16 portrait output.
pub const PORTRAIT_HEIGHT: u32 = 1920;

/// Operator-selected reformatting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransformPolicy {
    /// Keep the source geometry
    #[default]
    None,
    /// Cut a centered slice matching the output aspect
    Crop,
    /// Fit to width and letterbox vertically
    Pad,
    /// Fit to width over a blurred, cover-scaled copy of the frame
    BlurComposite,
}

impl TransformPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformPolicy::None => "none",
            TransformPolicy::Crop => "crop",
            TransformPolicy::Pad => "pad",
            TransformPolicy::BlurComposite => "blur",
        }
    }
}

impl fmt::Display for TransformPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformPolicy {
    type Err = TransformPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "original" => Ok(TransformPolicy::None),
            "crop" => Ok(TransformPolicy::Crop),
            "pad" | "letterbox" => Ok(TransformPolicy::Pad),
            "blur" | "blur_composite" => Ok(TransformPolicy::BlurComposite),
            _ => Err(TransformPolicyParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown output format: {0}")]
pub struct TransformPolicyParseError(String);

/// Policy plus target resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFormat {
    pub policy: TransformPolicy,
    pub width: u32,
    pub height: u32,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            policy: TransformPolicy::None,
            width: PORTRAIT_WIDTH,
            height: PORTRAIT_HEIGHT,
        }
    }
}

impl OutputFormat {
    pub fn new(policy: TransformPolicy, width: u32, height: u32) -> Self {
        Self {
            policy,
            width,
            height,
        }
    }
}

/// Backend-agnostic geometry of a per-file transform.
///
/// Computed once per source file and shared by every chunk of it. The
/// `none` policy has no descriptor at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformDescriptor {
    /// Crop `target_w x target_h` at `x_offset`, then scale to the output size
    Crop {
        target_w: u32,
        target_h: u32,
        x_offset: u32,
        out_w: u32,
        out_h: u32,
    },
    /// Scale to `scaled_w x scaled_h`, pad to the output size at `y_offset`
    Pad {
        scaled_w: u32,
        scaled_h: u32,
        y_offset: u32,
        out_w: u32,
        out_h: u32,
    },
    /// Fitted foreground (`out_w x scaled_h` at `y_offset`) over a blurred
    /// background covering `out_w x out_h`
    BlurComposite {
        out_w: u32,
        out_h: u32,
        scaled_h: u32,
        y_offset: u32,
    },
}

impl TransformDescriptor {
    /// Final frame size produced by the transform.
    pub fn output_size(&self) -> (u32, u32) {
        match *self {
            TransformDescriptor::Crop { out_w, out_h, .. }
            | TransformDescriptor::Pad { out_w, out_h, .. }
            | TransformDescriptor::BlurComposite { out_w, out_h, .. } => (out_w, out_h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parsing() {
        assert_eq!("crop".parse::<TransformPolicy>().unwrap(), TransformPolicy::Crop);
        assert_eq!("Letterbox".parse::<TransformPolicy>().unwrap(), TransformPolicy::Pad);
        assert_eq!("blur".parse::<TransformPolicy>().unwrap(), TransformPolicy::BlurComposite);
        assert!("stretch".parse::<TransformPolicy>().is_err());
    }

    #[test]
    fn test_default_output_is_portrait() {
        let format = OutputFormat::default();
        assert_eq!((format.width, format.height), (1080, 1920));
        assert_eq!(format.policy, TransformPolicy::None);
    }
}

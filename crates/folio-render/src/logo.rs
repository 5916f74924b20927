//! Company logo decoding.
//!
//! The profile stores the logo as base64, either bare or wrapped in a
//! `data:` URL. Anything that fails to decode is logged and dropped; a bad
//! logo never fails a render.

use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

/// Decoded pixels, flattened onto white, 8 bits per RGB channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
  pub width:  u32,
  pub height: u32,
  pub rgb:    Vec<u8>,
}

impl RasterImage {
  /// Width over height.
  pub fn aspect(&self) -> f32 { self.width as f32 / self.height.max(1) as f32 }
}

#[derive(Debug, Error)]
enum LogoError {
  #[error("invalid base64: {0}")]
  Base64(#[from] base64::DecodeError),

  #[error("unreadable image: {0}")]
  Image(#[from] image::ImageError),

  #[error("image has no pixels")]
  Empty,
}

/// The base64 payload of a `data:` URL, or the input unchanged.
fn payload(data: &str) -> &str {
  let data = data.trim();
  match data.strip_prefix("data:") {
    Some(rest) => rest.split_once(',').map_or(rest, |(_, b64)| b64),
    None => data,
  }
}

fn try_decode(data: &str) -> Result<RasterImage, LogoError> {
  let cleaned: String = payload(data).chars().filter(|c| !c.is_whitespace()).collect();
  let bytes = general_purpose::STANDARD.decode(cleaned)?;
  let rgba = image::load_from_memory(&bytes)?.to_rgba8();
  if rgba.width() == 0 || rgba.height() == 0 {
    return Err(LogoError::Empty);
  }

  let mut rgb = Vec::with_capacity(rgba.width() as usize * rgba.height() as usize * 3);
  for px in rgba.pixels() {
    let [r, g, b, a] = px.0;
    let alpha = u16::from(a);
    let over_white = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
    rgb.extend([over_white(r), over_white(g), over_white(b)]);
  }

  Ok(RasterImage { width: rgba.width(), height: rgba.height(), rgb })
}

/// Decode a stored logo, or `None` (with a warning) if it is unusable.
pub fn decode_logo(data: &str) -> Option<RasterImage> {
  match try_decode(data) {
    Ok(image) => Some(image),
    Err(e) => {
      tracing::warn!(error = %e, "could not decode company logo; rendering without it");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use image::{ImageFormat, Rgba, RgbaImage};

  use super::*;

  fn png_base64(w: u32, h: u32, color: [u8; 4]) -> String {
    let img = RgbaImage::from_pixel(w, h, Rgba(color));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    general_purpose::STANDARD.encode(buf.into_inner())
  }

  #[test]
  fn decodes_bare_base64() {
    let logo = decode_logo(&png_base64(4, 2, [255, 0, 0, 255])).unwrap();
    assert_eq!((logo.width, logo.height), (4, 2));
    assert_eq!(&logo.rgb[..3], &[255, 0, 0]);
    assert_eq!(logo.aspect(), 2.0);
  }

  #[test]
  fn decodes_data_url_and_flattens_alpha() {
    let url = format!("data:image/png;base64,{}", png_base64(1, 1, [0, 0, 0, 0]));
    let logo = decode_logo(&url).unwrap();
    assert_eq!(logo.rgb, vec![255, 255, 255]);
  }

  #[test]
  fn garbage_is_dropped() {
    assert!(decode_logo("not base64 at all!!").is_none());
    assert!(decode_logo(&general_purpose::STANDARD.encode(b"not an image")).is_none());
  }
}

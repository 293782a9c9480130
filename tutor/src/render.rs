//! Dispatch of precomputed outputs to presentation forms.

use base64::Engine;
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::types::Output;

/// An output ready for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedOutput {
    /// Preformatted text.
    Text { text: String },
    /// Decoded raster image bytes.
    Bitmap {
        mime: &'static str,
        #[serde(skip)]
        bytes: Vec<u8>,
    },
    /// Scalable graphics markup, inserted as-is.
    Svg { markup: String },
    /// Markup embedded in its own scrollable frame.
    Html { markup: String },
}

/// Render one output. Returns `None` for outputs that are skipped: the
/// explicitly unsupported kinds and images whose payload does not decode.
pub fn render_output(output: &Output) -> Option<RenderedOutput> {
    match output {
        Output::Stream { text, .. } | Output::Text { text } => {
            Some(RenderedOutput::Text { text: text.clone() })
        }
        Output::Image { format, data } => match decode_image(data) {
            Ok(bytes) => Some(RenderedOutput::Bitmap {
                mime: format.mime(),
                bytes,
            }),
            Err(err) => {
                warn!(mime = format.mime(), err = %err, "image payload is not valid base64");
                None
            }
        },
        Output::Svg { markup } => Some(RenderedOutput::Svg {
            markup: markup.clone(),
        }),
        Output::Html { markup } => Some(RenderedOutput::Html {
            markup: markup.clone(),
        }),
        Output::Unsupported { output_type } => {
            debug!(output_type = %output_type, "skipping unsupported output");
            None
        }
    }
}

/// Decode a notebook image payload. Notebooks wrap base64 at 76 columns, so
/// whitespace is removed first.
fn decode_image(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD.decode(compact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ImageFormat;

    #[test]
    fn stream_and_plain_text_render_as_text() {
        let stream = Output::Stream {
            name: "stdout".to_string(),
            text: "hi\n".to_string(),
        };
        assert_eq!(
            render_output(&stream),
            Some(RenderedOutput::Text {
                text: "hi\n".to_string()
            })
        );
        let plain = Output::Text {
            text: "42".to_string(),
        };
        assert_eq!(
            render_output(&plain),
            Some(RenderedOutput::Text {
                text: "42".to_string()
            })
        );
    }

    #[test]
    fn images_are_decoded_before_display() {
        let output = Output::Image {
            format: ImageFormat::Png,
            data: "iVBO\nRw0K\nGgo=\n".to_string(),
        };
        assert_eq!(
            render_output(&output),
            Some(RenderedOutput::Bitmap {
                mime: "image/png",
                bytes: vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'],
            })
        );
    }

    #[test]
    fn undecodable_image_is_skipped() {
        let output = Output::Image {
            format: ImageFormat::Jpeg,
            data: "***".to_string(),
        };
        assert_eq!(render_output(&output), None);
    }

    #[test]
    fn markup_outputs_pass_through() {
        let svg = Output::Svg {
            markup: "<svg></svg>".to_string(),
        };
        let html = Output::Html {
            markup: "<table></table>".to_string(),
        };
        assert!(matches!(render_output(&svg), Some(RenderedOutput::Svg { .. })));
        assert!(matches!(render_output(&html), Some(RenderedOutput::Html { .. })));
    }

    #[test]
    fn unsupported_outputs_render_nothing() {
        let output = Output::Unsupported {
            output_type: "error".to_string(),
        };
        assert_eq!(render_output(&output), None);
    }
}

//! Source format detection from locators, names and content types.

use meshport_core::InputFormat;

use crate::models::ConversionInput;

/// Infer the input format. Never fails; `None` means no hint matched.
///
/// - URL: the path suffix, ignoring query string and fragment.
/// - Blob: the declared content type first, then the file name.
/// - Buffer: nothing to go on.
pub fn detect(input: &ConversionInput) -> Option<InputFormat> {
    match input {
        ConversionInput::Url(url) => detect_from_url(url),
        ConversionInput::Blob(blob) => blob
            .content_type
            .as_deref()
            .and_then(InputFormat::from_mime_type)
            .or_else(|| {
                blob.filename
                    .as_deref()
                    .and_then(InputFormat::from_file_name)
            }),
        ConversionInput::Buffer(_) => None,
    }
}

/// Match the path suffix of a URL.
pub fn detect_from_url(url: &str) -> Option<InputFormat> {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    InputFormat::from_file_name(&url[..end])
}

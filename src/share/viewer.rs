use serde::Serialize;

/// How a client should present a signed URL, keyed by file extension.
///
/// A closed set with an explicit pass-through default: unrecognized
/// extensions get the signed URL untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerStrategy {
    /// Hand the signed URL straight to the client.
    Direct,
    /// Wrap in the Google Docs viewer for office formats browsers cannot
    /// render natively.
    OfficeGview,
    /// Media the browser can play or display inline.
    MediaInline,
}

impl ViewerStrategy {
    /// Pick a strategy from the file name's normalized extension.
    pub fn for_file_name(file_name: &str) -> Self {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "rtf" => {
                ViewerStrategy::OfficeGview
            }
            "mp3" | "m4a" | "wav" | "ogg" | "mp4" | "webm" | "mov" | "png" | "jpg" | "jpeg"
            | "gif" | "webp" | "svg" => ViewerStrategy::MediaInline,
            _ => ViewerStrategy::Direct,
        }
    }

    /// The URL a client should load for viewing.
    pub fn view_url(&self, signed_url: &str) -> String {
        match self {
            ViewerStrategy::OfficeGview => format!(
                "https://docs.google.com/gview?url={}&embedded=true",
                urlencode(signed_url)
            ),
            ViewerStrategy::Direct | ViewerStrategy::MediaInline => signed_url.to_string(),
        }
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

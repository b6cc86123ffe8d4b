/// Ranked encoding preference list probed at stream-acquisition time.
///
/// The first entry the platform recorder claims to support wins; when none
/// match, the recorder falls back to its own default and we log it.
pub const PREFERRED_MIME_TYPES: &[&str] = &[
    "audio/mp4;codecs=mp4a.40.2",
    "audio/mp4",
    "audio/webm;codecs=opus",
    "audio/webm",
    "audio/ogg;codecs=opus",
    "audio/ogg",
];

/// Pick the first supported encoding from a ranked list.
pub fn negotiate<'a>(
    preferences: impl IntoIterator<Item = &'a str>,
    supports: impl Fn(&str) -> bool,
) -> Option<String> {
    preferences
        .into_iter()
        .find(|mime| supports(mime))
        .map(str::to_string)
}

/// Map an encoding family to the upload file extension.
///
/// The webhook contract names the audio part `voice-message.<ext>`, so the
/// extension must agree with the blob's negotiated MIME type.
pub fn extension_for_mime(mime: &str) -> &'static str {
    if mime.contains("mp4") {
        "m4a"
    } else if mime.contains("ogg") {
        "ogg"
    } else {
        "webm"
    }
}

/// Guess a MIME type from a recording's file extension.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "m4a" | "mp4" => "audio/mp4",
        "ogg" => "audio/ogg",
        "mp3" => "audio/mpeg",
        _ => "audio/webm",
    }
}

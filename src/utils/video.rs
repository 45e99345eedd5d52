use url::Url;

const EMBEDDED_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
    "youtu.be",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSource {
    /// Served directly; playback position is reported by our own player.
    Hosted,
    /// Played inside a third-party embed whose playback we cannot observe.
    Embedded,
}

pub fn classify_video_url(video_url: &str) -> VideoSource {
    let Ok(url) = Url::parse(video_url.trim()) else {
        return VideoSource::Hosted;
    };
    match url.host_str() {
        Some(host) if EMBEDDED_HOSTS.iter().any(|h| host.eq_ignore_ascii_case(h)) => {
            VideoSource::Embedded
        }
        _ => VideoSource::Hosted,
    }
}

//! Media source descriptors
//!
//! A [`SourceDescriptor`] is what the caller asked for (an asset or a URI);
//! a [`MediaSource`] is what the engine opens after asset resolution and
//! stream format selection.

use evp_common::messages::CreateMessage;

use crate::assets::AssetResolver;
use crate::error::{Error, Result};

/// Streaming container format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    SmoothStreaming,
    Dash,
    Hls,
    /// Plain progressive file (mp4, webm, ...)
    Progressive,
}

impl StreamFormat {
    /// Parse a caller-supplied format hint (`ss`, `dash`, `hls`, `other`)
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint {
            "ss" => Some(StreamFormat::SmoothStreaming),
            "dash" => Some(StreamFormat::Dash),
            "hls" => Some(StreamFormat::Hls),
            "other" => Some(StreamFormat::Progressive),
            _ => None,
        }
    }

    /// Infer the format from the last path segment of a URI
    pub fn infer(uri: &str) -> Self {
        let path = uri
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let last_segment = path.rsplit('/').next().unwrap_or_default();

        if last_segment.ends_with(".mpd") {
            StreamFormat::Dash
        } else if last_segment.ends_with(".m3u8") {
            StreamFormat::Hls
        } else if last_segment.ends_with(".ism")
            || last_segment.ends_with(".isml")
            || path.ends_with(".ism/manifest")
            || path.ends_with(".isml/manifest")
        {
            StreamFormat::SmoothStreaming
        } else {
            StreamFormat::Progressive
        }
    }
}

/// Where the engine reads the media from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLocation {
    /// Bundled asset or local file
    Local,
    /// http(s) stream
    Network,
}

/// Fully resolved source handed to the media engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    pub uri: String,
    pub format: StreamFormat,
    pub location: SourceLocation,
}

impl MediaSource {
    /// Build a source from a URI and an optional format hint.
    ///
    /// Without a hint the format is inferred from the URI; an unknown hint
    /// is rejected.
    pub fn from_uri(uri: &str, format_hint: Option<&str>) -> Result<Self> {
        if uri.trim().is_empty() {
            return Err(Error::invalid_argument("source uri must not be empty"));
        }

        let format = match format_hint {
            Some(hint) => StreamFormat::from_hint(hint).ok_or_else(|| {
                Error::invalid_argument(format!("unsupported format hint: {}", hint))
            })?,
            None => StreamFormat::infer(uri),
        };

        let scheme = uri
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase());
        let location = match scheme.as_deref() {
            Some("http") | Some("https") => SourceLocation::Network,
            _ => SourceLocation::Local,
        };

        Ok(Self {
            uri: uri.to_string(),
            format,
            location,
        })
    }
}

/// The caller's choice of source, fixed at creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    Asset {
        name: String,
        package: Option<String>,
    },
    Uri {
        uri: String,
        format_hint: Option<String>,
    },
}

impl SourceDescriptor {
    /// Resolve into the source the engine opens
    pub fn resolve(&self, assets: &dyn AssetResolver) -> Result<MediaSource> {
        match self {
            SourceDescriptor::Asset { name, package } => {
                let uri = assets.asset_uri(name, package.as_deref());
                MediaSource::from_uri(&uri, None)
            }
            SourceDescriptor::Uri { uri, format_hint } => {
                MediaSource::from_uri(uri, format_hint.as_deref())
            }
        }
    }
}

impl TryFrom<&CreateMessage> for SourceDescriptor {
    type Error = Error;

    fn try_from(msg: &CreateMessage) -> Result<Self> {
        match (&msg.asset, &msg.uri) {
            (Some(asset), None) => {
                if asset.trim().is_empty() {
                    return Err(Error::invalid_argument("asset name must not be empty"));
                }
                Ok(SourceDescriptor::Asset {
                    name: asset.clone(),
                    package: msg.package_name.clone(),
                })
            }
            (None, Some(uri)) => Ok(SourceDescriptor::Uri {
                uri: uri.clone(),
                format_hint: msg.format_hint.clone(),
            }),
            (Some(_), Some(_)) => Err(Error::invalid_argument(
                "create accepts either an asset or a uri, not both",
            )),
            (None, None) => Err(Error::invalid_argument(
                "create requires an asset or a uri",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::BundleAssetResolver;

    #[test]
    fn test_format_hints() {
        assert_eq!(StreamFormat::from_hint("ss"), Some(StreamFormat::SmoothStreaming));
        assert_eq!(StreamFormat::from_hint("dash"), Some(StreamFormat::Dash));
        assert_eq!(StreamFormat::from_hint("hls"), Some(StreamFormat::Hls));
        assert_eq!(StreamFormat::from_hint("other"), Some(StreamFormat::Progressive));
        assert_eq!(StreamFormat::from_hint("mkv"), None);
    }

    #[test]
    fn test_format_inference() {
        assert_eq!(StreamFormat::infer("https://cdn.test/live/index.m3u8"), StreamFormat::Hls);
        assert_eq!(StreamFormat::infer("https://cdn.test/a/manifest.mpd?token=1"), StreamFormat::Dash);
        assert_eq!(
            StreamFormat::infer("https://cdn.test/movie.ism/Manifest"),
            StreamFormat::SmoothStreaming
        );
        assert_eq!(StreamFormat::infer("file:///tmp/clip.mp4"), StreamFormat::Progressive);
    }

    #[test]
    fn test_location_from_scheme() {
        let network = MediaSource::from_uri("HTTPS://example.com/a.mp4", None).unwrap();
        assert_eq!(network.location, SourceLocation::Network);

        let local = MediaSource::from_uri("file:///sdcard/a.mp4", None).unwrap();
        assert_eq!(local.location, SourceLocation::Local);
    }

    #[test]
    fn test_unknown_hint_rejected() {
        let result = MediaSource::from_uri("https://example.com/a", Some("rtsp"));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_descriptor_requires_exactly_one_source() {
        let both = CreateMessage {
            asset: Some("a.mp4".into()),
            uri: Some("https://example.com/a.mp4".into()),
            ..Default::default()
        };
        assert!(matches!(
            SourceDescriptor::try_from(&both),
            Err(Error::InvalidArgument(_))
        ));

        let neither = CreateMessage::default();
        assert!(matches!(
            SourceDescriptor::try_from(&neither),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_asset_descriptor_resolves_to_asset_uri() {
        let msg = CreateMessage {
            asset: Some("videos/bee.mp4".into()),
            package_name: Some("demo".into()),
            ..Default::default()
        };
        let descriptor = SourceDescriptor::try_from(&msg).unwrap();
        let source = descriptor.resolve(&BundleAssetResolver::default()).unwrap();

        assert_eq!(source.uri, "asset:///flutter_assets/packages/demo/videos/bee.mp4");
        assert_eq!(source.location, SourceLocation::Local);
        assert_eq!(source.format, StreamFormat::Progressive);
    }
}

//! Asset name resolution
//!
//! Asset-backed sessions are opened from `asset:///<lookup key>`. The lookup
//! key is computed by the host's asset bundle layout.

/// Scheme prefix for bundled assets
pub const ASSET_URI_PREFIX: &str = "asset:///";

/// Default root directory of bundled assets
pub const DEFAULT_ASSET_ROOT: &str = "flutter_assets";

/// Maps asset names (optionally scoped to a package) to lookup keys
pub trait AssetResolver: Send + Sync {
    fn lookup_key(&self, asset: &str, package: Option<&str>) -> String;

    /// URI the media engine opens for this asset
    fn asset_uri(&self, asset: &str, package: Option<&str>) -> String {
        format!("{}{}", ASSET_URI_PREFIX, self.lookup_key(asset, package))
    }
}

/// Resolver for the standard bundle layout:
/// `<root>/<asset>` and `<root>/packages/<package>/<asset>`
#[derive(Debug, Clone)]
pub struct BundleAssetResolver {
    root: String,
}

impl BundleAssetResolver {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        Self {
            root: root.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for BundleAssetResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_ROOT)
    }
}

impl AssetResolver for BundleAssetResolver {
    fn lookup_key(&self, asset: &str, package: Option<&str>) -> String {
        match package {
            Some(package) => format!("{}/packages/{}/{}", self.root, package, asset),
            None => format!("{}/{}", self.root, asset),
        }
    }
}

//! Loader entry points an emitted bundle calls into.

/// Registers a preload table of function or string entries
pub const PRELOAD_CALL: &str = "sap.ui.require.preload";

/// Registers a versioned preload table through the legacy API
pub const LEGACY_PRELOAD_CALL: &str = "jQuery.sap.registerPreloadedModules";

/// Format version of the legacy preload table
pub const LEGACY_PRELOAD_VERSION: &str = "2.0";

/// Loader configuration call carrying the dependency cache
pub const LOADER_CONFIG_CALL: &str = "sap.ui.loader.config";

/// Configuration key of the dependency cache
pub const DEP_CACHE_KEY: &str = "depCacheUI5";

/// Header comment naming the bundle
pub const BUNDLE_HEADER: &str = "//@ui5-bundle";

/// Suffix of debug copies, inserted before the extension
pub const DEBUG_SUFFIX: &str = "-dbg";

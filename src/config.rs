//! Provider-level configuration. There are no process-wide globals; every toggle is a field on
//! the [`BehaviorProvider`](crate::provider::BehaviorProvider) constructed by the embedder.

/// Configuration toggles for a [`BehaviorProvider`](crate::provider::BehaviorProvider).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// When set, every read/write/modify the provider records also resolves and logs the
    /// touched key's graph address at `debug` level. Useful when diagnosing why an atom was
    /// retained or dropped downstream; expensive enough that it defaults to off.
    pub log_address_resolutions: bool,
    /// Whether images flagged as swapchain-owned always report an empty overlap set (the
    /// distilled spec's convention) or are treated as ordinary bound images once a real memory
    /// binding exists for them. Capture tools that redirect swapchain images to host-visible
    /// memory for image priming need the latter; ordinary dead-code elimination wants the
    /// former, conservative default.
    pub conservative_swapchain_images: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_address_resolutions: false,
            conservative_swapchain_images: true,
        }
    }
}

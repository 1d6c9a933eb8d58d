//! Typed per-source configuration and channel lifecycle.

use super::channel::{Clock, SourceId, StreamingChannel, StreamingChannelConfig, SystemClock};
use crate::{AudioFormat, WaveResult, WaveformError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Creates streaming channels on first reference and tracks the live ones.
///
/// Channels are held weakly: a channel whose last strong handle is dropped is
/// disposed by its destructor and replaced on the next reference.
pub struct ChannelRegistry {
    default_config: StreamingChannelConfig,
    configs: Mutex<HashMap<SourceId, StreamingChannelConfig>>,
    channels: Mutex<HashMap<SourceId, Weak<StreamingChannel>>>,
    clock: Arc<dyn Clock>,
}

impl ChannelRegistry {
    /// Create a registry that falls back to `default_config` for unconfigured sources.
    ///
    /// # Errors
    /// Returns [`crate::WaveformError::InvalidConfiguration`] if the default is invalid.
    pub fn new(default_config: StreamingChannelConfig) -> WaveResult<Self> {
        Self::with_clock(default_config, Arc::new(SystemClock))
    }

    /// Create a registry whose channels read local time from `clock`.
    ///
    /// # Errors
    /// Returns [`crate::WaveformError::InvalidConfiguration`] if the default is invalid.
    pub fn with_clock(
        default_config: StreamingChannelConfig,
        clock: Arc<dyn Clock>,
    ) -> WaveResult<Self> {
        default_config.validate()?;
        Ok(Self {
            default_config,
            configs: Mutex::new(HashMap::new()),
            channels: Mutex::new(HashMap::new()),
            clock,
        })
    }

    /// Set the configuration used the next time a channel is created for `source`.
    ///
    /// # Errors
    /// Returns [`crate::WaveformError::InvalidConfiguration`] if `config` is invalid;
    /// the previous configuration is kept.
    pub fn configure(
        &self,
        source: impl Into<SourceId>,
        config: StreamingChannelConfig,
    ) -> WaveResult<()> {
        config.validate()?;
        self.configs.lock().insert(source.into(), config);
        Ok(())
    }

    /// Configuration that applies to `source`.
    pub fn config_for(&self, source: &SourceId) -> StreamingChannelConfig {
        self.configs
            .lock()
            .get(source)
            .cloned()
            .unwrap_or_else(|| self.default_config.clone())
    }

    /// Return the live channel for `source`, creating it if needed.
    ///
    /// # Errors
    /// Returns [`WaveformError::UnsupportedFormat`] if a live channel for
    /// `source` already uses a different format, or propagates configuration
    /// errors from channel creation.
    pub fn get_or_create(
        &self,
        source: impl Into<SourceId>,
        format: AudioFormat,
    ) -> WaveResult<Arc<StreamingChannel>> {
        let source = source.into();
        let mut channels = self.channels.lock();

        if let Some(channel) = channels.get(&source).and_then(Weak::upgrade) {
            if !channel.is_closed() {
                if channel.format() != &format {
                    return Err(WaveformError::unsupported_format(
                        "get_or_create",
                        format!("{source}: requested {format}, channel uses {}", channel.format()),
                    ));
                }
                return Ok(channel);
            }
        }

        let config = self.config_for(&source);
        let channel = Arc::new(StreamingChannel::with_clock(
            source.clone(),
            format,
            config,
            Arc::clone(&self.clock),
        )?);
        tracing::debug!(%source, live = channels.len() + 1, "registered streaming channel");
        channels.insert(source, Arc::downgrade(&channel));
        Ok(channel)
    }

    /// Live channel for `source`, without creating one.
    pub fn get(&self, source: &SourceId) -> Option<Arc<StreamingChannel>> {
        self.channels
            .lock()
            .get(source)
            .and_then(Weak::upgrade)
            .filter(|channel| !channel.is_closed())
    }

    /// Dispose the channel for `source`. Returns false if none was live.
    pub fn close(&self, source: &SourceId) -> bool {
        let removed = self.channels.lock().remove(source);
        match removed.and_then(|weak| weak.upgrade()) {
            Some(channel) => {
                channel.dispose();
                true
            }
            None => false,
        }
    }

    /// Sources with a live channel, sorted.
    pub fn active_sources(&self) -> Vec<SourceId> {
        let mut channels = self.channels.lock();
        channels.retain(|_, weak| weak.upgrade().is_some_and(|channel| !channel.is_closed()));
        let mut sources: Vec<SourceId> = channels.keys().cloned().collect();
        sources.sort();
        sources
    }

    /// Dispose every live channel.
    pub fn close_all(&self) {
        let drained: Vec<_> = self.channels.lock().drain().collect();
        tracing::debug!(count = drained.len(), "closing all streaming channels");
        for (_, weak) in drained {
            if let Some(channel) = weak.upgrade() {
                channel.dispose();
            }
        }
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self {
            default_config: StreamingChannelConfig::default(),
            configs: Mutex::new(HashMap::new()),
            channels: Mutex::new(HashMap::new()),
            clock: Arc::new(SystemClock),
        }
    }
}

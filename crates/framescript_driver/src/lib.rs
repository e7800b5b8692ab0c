// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless driver for FrameScript scenes.
//!
//! - Render argument parsing and worker range split
//! - RON settings with environment overrides
//! - Backend HTTP client: media metadata, audio plan, progress, cancel
//! - Frame-fetch codec and a transport-agnostic client with reconnect
//! - Export loop producing one JSON frame capture per line

pub mod backend;
pub mod bench;
pub mod config;
pub mod error;
pub mod export;
pub mod frame_client;
pub mod frame_protocol;
pub mod render_args;

pub use backend::{BackendClient, CancelResponse, MetadataCache, ProgressPayload};
pub use bench::{mount_bench, BenchConfig, BenchScene, BRANCH_EASINGS};
pub use config::{DriverSettings, DEFAULT_BACKEND_URL, SETTINGS_ENV};
pub use error::{BackendError, DriverError, FrameError, Result};
pub use export::{ExportReport, Exporter, RenderHost};
pub use frame_client::{
    FrameClient, FrameConnection, FrameTransport, ReconnectPolicy, RequestTicket, RequestTracker,
};
pub use frame_protocol::{decode_frame_packet, DecodedFrame, FrameRequest, HEADER_LEN};
pub use render_args::{chunk_ranges, RenderArgs};

//! External service clients

pub mod provider;

pub use provider::{
    ArtistRef, HttpTrackProvider, ProviderError, TokenGrant, TrackInfo, TrackProvider,
};

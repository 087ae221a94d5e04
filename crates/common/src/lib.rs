//! Shared message model, error definitions, and utilities used across all
//! lightning crates.

pub mod error;
pub mod types;

pub use {
    error::{Error, FromMessage, LightningError, Result},
    types::{
        Attachment, Author, DeletedMessage, Embed, EmbedField, Message, MessageKind, OriginKey,
        PlatformRef, Sticker, StickerFormat,
    },
};

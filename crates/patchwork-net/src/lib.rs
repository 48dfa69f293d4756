#![forbid(unsafe_code)]

//! HTTP transport for update artifacts.
//!
//! [`Net`] is the seam the downloader is written against; [`HttpClient`] is the
//! reqwest-backed implementation and [`TimeoutNet`] bounds the request/response
//! phase of any other implementation.

mod client;
mod error;
mod timeout;
mod traits;
mod types;

pub use crate::{
    client::HttpClient,
    error::{NetError, NetResult},
    timeout::TimeoutNet,
    traits::{ByteStream, Net, NetExt, ResponseBody},
    types::{Headers, NetOptions},
};

mod client;

pub use client::{
    ApiErrorClass, Change, ChangeOutcome, ChangeStatus, KeepClient, KeepError, RemoteItem,
    RemoteList,
};
pub use reqwest::StatusCode;

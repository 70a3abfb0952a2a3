//! Request handlers.

pub mod accounts;
pub mod admin;
pub mod auth;
pub mod deliveries;
pub mod listing;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;

use axum::extract::FromRequest;

use crate::error::AppError;

/// JSON body extractor whose rejections render as [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mailer module - email transport backends.

pub mod mock;
pub mod providers;
mod traits;

pub use mock::MockMailer;
pub use providers::{LocalMailer, MailgunMailer, PostmarkMailer, SendGridMailer, from_config};
pub use traits::*;

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Payment provider integrations.

pub mod paystack;

pub use paystack::{
    PaymentIntent, PaymentVerification, PaymentVerifier, PaystackClient, PaystackError,
};

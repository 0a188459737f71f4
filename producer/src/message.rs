// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::ops::RangeInclusive;

pub const MESSAGE_ID_RANGE: RangeInclusive<u32> = 10000..=99999;

/// `"Message Id <5 digits>: <msg>"` with a random id.
pub fn demo_message(msg: &str) -> String {
    demo_message_with(&mut fastrand::Rng::new(), msg)
}

pub fn demo_message_with(rng: &mut fastrand::Rng, msg: &str) -> String {
    format!("Message Id {}: {}", rng.u32(MESSAGE_ID_RANGE), msg)
}

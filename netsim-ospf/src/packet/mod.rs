//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod lsa;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

// OSPFv2 Options field.
//
// Only the bits relevant to LSA origination are modeled. The wire encoding
// of the field belongs to the packet codec layer.
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct Options: u8 {
        const E = 0x02;
        const MC = 0x04;
        const NP = 0x08;
        const DC = 0x20;
    }
}

//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod area;
pub mod config;
pub mod debug;
pub mod error;
pub mod instance;
pub mod lsdb;
pub mod packet;

// SPDX-License-Identifier: MIT

pub mod docs;
pub mod server;
pub mod workflow;

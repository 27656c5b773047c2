// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod handle;
pub mod orb;
pub mod pool_buffers;
pub mod process;
pub mod transport;

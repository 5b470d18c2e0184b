// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::error::ProfilerResult;
use crate::results::Results;
use std::io::{Read, Write};
use tracing::debug;

/// Pretty-printed JSON of the full snapshot, field names as in [`Results`].
pub fn write_json<W: Write>(results: Option<&Results>, mut w: W) -> ProfilerResult<()> {
    let Some(results) = results else {
        return Ok(());
    };
    serde_json::to_writer_pretty(&mut w, results)?;
    w.write_all(b"\n")?;
    w.flush()?;
    debug!(ops = results.op_stats.len(), "wrote JSON profile");
    Ok(())
}

pub fn read_json<R: Read>(r: R) -> ProfilerResult<Results> {
    Ok(serde_json::from_reader(r)?)
}

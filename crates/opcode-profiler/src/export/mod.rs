// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Renderers for a [`Results`] snapshot.
//!
//! Every exporter takes `Option<&Results>` and writes nothing for `None`, so callers can
//! export unconditionally whether or not a session ever ran. The same operations are also
//! available as methods on [`Results`].

pub mod csv;
pub mod json;
pub mod legacy;
pub mod pprof;
pub mod report;

use crate::error::ProfilerResult;
use crate::results::Results;
use std::io::Write;

pub use self::csv::CsvSection;
pub use self::pprof::PprofOptions;
pub use self::report::ReportOptions;

impl Results {
    pub fn write_json<W: Write>(&self, w: W) -> ProfilerResult<()> {
        json::write_json(Some(self), w)
    }

    pub fn write_csv<W: Write>(&self, w: W) -> ProfilerResult<()> {
        csv::write_csv(Some(self), w)
    }

    pub fn write_csv_section<W: Write>(&self, section: &str, w: W) -> ProfilerResult<()> {
        csv::write_csv_section(Some(self), section, w)
    }

    pub fn write_pprof<W: Write>(&self, w: W, options: &PprofOptions) -> ProfilerResult<()> {
        pprof::write_pprof(Some(self), w, options)
    }

    pub fn write_report<W: Write>(&self, w: W, options: &ReportOptions) -> ProfilerResult<()> {
        report::write_report(Some(self), w, options)
    }

    pub fn write_legacy<W: Write>(&self, w: W) -> ProfilerResult<()> {
        legacy::write_legacy(Some(self), w)
    }
}

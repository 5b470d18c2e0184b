// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! pprof protobuf export.
//!
//! Gas is always the first sample value. When the session captured call stacks every stack
//! sample becomes one pprof sample, which gives real flame graphs; otherwise each source
//! location becomes a single-frame sample.

use crate::error::ProfilerResult;
use crate::metrics::StackSample;
use crate::results::Results;
use prost::Message;
use std::collections::HashMap;
use std::io::Write;
use tracing::debug;

/// The subset of `profile.proto` this exporter emits.
pub mod proto {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Profile {
        #[prost(message, repeated, tag = "1")]
        pub sample_type: Vec<ValueType>,
        #[prost(message, repeated, tag = "2")]
        pub sample: Vec<Sample>,
        #[prost(message, repeated, tag = "4")]
        pub location: Vec<Location>,
        #[prost(message, repeated, tag = "5")]
        pub function: Vec<Function>,
        #[prost(string, repeated, tag = "6")]
        pub string_table: Vec<String>,
        #[prost(int64, tag = "9")]
        pub time_nanos: i64,
        #[prost(int64, tag = "10")]
        pub duration_nanos: i64,
        #[prost(message, optional, tag = "11")]
        pub period_type: Option<ValueType>,
        #[prost(int64, tag = "12")]
        pub period: i64,
        #[prost(int64, tag = "14")]
        pub default_sample_type: i64,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct ValueType {
        #[prost(int64, tag = "1")]
        pub r#type: i64,
        #[prost(int64, tag = "2")]
        pub unit: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Sample {
        /// Leaf first.
        #[prost(uint64, repeated, tag = "1")]
        pub location_id: Vec<u64>,
        #[prost(int64, repeated, tag = "2")]
        pub value: Vec<i64>,
        #[prost(message, repeated, tag = "3")]
        pub label: Vec<Label>,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct Label {
        #[prost(int64, tag = "1")]
        pub key: i64,
        #[prost(int64, tag = "2")]
        pub str: i64,
        #[prost(int64, tag = "3")]
        pub num: i64,
        #[prost(int64, tag = "4")]
        pub num_unit: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Location {
        #[prost(uint64, tag = "1")]
        pub id: u64,
        #[prost(message, repeated, tag = "4")]
        pub line: Vec<Line>,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct Line {
        #[prost(uint64, tag = "1")]
        pub function_id: u64,
        #[prost(int64, tag = "2")]
        pub line: i64,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct Function {
        #[prost(uint64, tag = "1")]
        pub id: u64,
        #[prost(int64, tag = "2")]
        pub name: i64,
        #[prost(int64, tag = "3")]
        pub system_name: i64,
        #[prost(int64, tag = "4")]
        pub filename: i64,
        #[prost(int64, tag = "5")]
        pub start_line: i64,
    }
}

/// Which optional sample values and labels to emit. Gas is always emitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PprofOptions {
    pub duration: bool,
    pub count: bool,
    pub package_label: bool,
    pub depth_label: bool,
}

impl PprofOptions {
    /// Add a `duration` value. Ignored when the session was recorded without timing.
    pub fn with_duration(mut self) -> Self {
        self.duration = true;
        self
    }

    pub fn with_count(mut self) -> Self {
        self.count = true;
        self
    }

    /// Label each sample with the package path of its leaf frame.
    pub fn with_package_label(mut self) -> Self {
        self.package_label = true;
        self
    }

    /// Label each sample with its stack depth.
    pub fn with_depth_label(mut self) -> Self {
        self.depth_label = true;
        self
    }
}

#[derive(Clone, Copy)]
struct SampleValues {
    gas: i64,
    duration_ns: u64,
    count: u64,
}

struct ProfileBuilder {
    profile: proto::Profile,
    strings: HashMap<String, i64>,
    // (name, file, line) -> location id; each location owns one function of the same id.
    locations: HashMap<(String, String, i64), u64>,
    emit_duration: bool,
    options: PprofOptions,
}

impl ProfileBuilder {
    fn new(results: &Results, options: PprofOptions) -> Self {
        let mut builder = Self {
            profile: proto::Profile::default(),
            strings: HashMap::new(),
            locations: HashMap::new(),
            emit_duration: options.duration && results.timing_enabled,
            options,
        };
        // String index 0 must be the empty string.
        builder.string("");

        let gas = builder.value_type("gas", "units");
        builder.profile.sample_type.push(gas);
        if builder.emit_duration {
            let duration = builder.value_type("duration", "nanoseconds");
            builder.profile.sample_type.push(duration);
        }
        if options.count {
            let count = builder.value_type("count", "count");
            builder.profile.sample_type.push(count);
        }
        builder.profile.period_type = Some(gas);
        builder.profile.period = 1;
        builder.profile.default_sample_type = gas.r#type;
        builder.profile.time_nanos = results.start_time.timestamp_nanos_opt().unwrap_or(0);
        builder.profile.duration_nanos = results.duration().num_nanoseconds().unwrap_or(0);
        builder
    }

    fn string(&mut self, s: &str) -> i64 {
        if let Some(index) = self.strings.get(s) {
            return *index;
        }
        let index = self.profile.string_table.len() as i64;
        self.profile.string_table.push(s.to_string());
        self.strings.insert(s.to_string(), index);
        index
    }

    fn value_type(&mut self, ty: &str, unit: &str) -> proto::ValueType {
        proto::ValueType {
            r#type: self.string(ty),
            unit: self.string(unit),
        }
    }

    fn location(&mut self, name: &str, file: &str, line: i64) -> u64 {
        let key = (name.to_string(), file.to_string(), line);
        if let Some(id) = self.locations.get(&key) {
            return *id;
        }
        let id = self.profile.location.len() as u64 + 1;
        let name = self.string(name);
        let filename = self.string(file);
        self.profile.function.push(proto::Function {
            id,
            name,
            system_name: name,
            filename,
            start_line: line,
        });
        self.profile.location.push(proto::Location {
            id,
            line: vec![proto::Line {
                function_id: id,
                line,
            }],
        });
        self.locations.insert(key, id);
        id
    }

    fn sample(&mut self, location_id: Vec<u64>, values: SampleValues, pkg: &str, depth: usize) {
        let mut value = vec![values.gas];
        if self.emit_duration {
            value.push(values.duration_ns as i64);
        }
        if self.options.count {
            value.push(values.count as i64);
        }

        let mut label = Vec::new();
        if self.options.package_label && !pkg.is_empty() {
            let key = self.string("package");
            let str = self.string(pkg);
            label.push(proto::Label {
                key,
                str,
                ..Default::default()
            });
        }
        if self.options.depth_label {
            let key = self.string("depth");
            label.push(proto::Label {
                key,
                num: depth as i64,
                ..Default::default()
            });
        }

        self.profile.sample.push(proto::Sample {
            location_id,
            value,
            label,
        });
    }

    fn add_stack_sample(&mut self, sample: &StackSample) {
        let location_id = sample
            .frames
            .iter()
            .rev()
            .map(|frame| self.location(&frame.display_name(), &frame.file, frame.line as i64))
            .collect();
        let pkg = sample
            .frames
            .last()
            .map(|frame| frame.pkg_path.clone())
            .unwrap_or_default();
        self.sample(
            location_id,
            SampleValues {
                gas: sample.gas,
                duration_ns: sample.duration_ns,
                count: sample.count,
            },
            &pkg,
            sample.frames.len(),
        );
    }
}

/// Build the profile message for `results`.
pub fn build_profile(results: &Results, options: &PprofOptions) -> proto::Profile {
    let mut builder = ProfileBuilder::new(results, *options);

    if !results.stack_samples.is_empty() {
        for sample in &results.stack_samples {
            builder.add_stack_sample(sample);
        }
    } else {
        for (key, stat) in &results.location_stats {
            let name = if stat.func.is_empty() {
                key.as_str()
            } else {
                stat.func.as_str()
            };
            let id = builder.location(name, &stat.file, stat.line as i64);
            builder.sample(
                vec![id],
                SampleValues {
                    gas: stat.gas,
                    duration_ns: stat.timing.total_ns,
                    count: stat.timing.count,
                },
                &stat.pkg_path,
                1,
            );
        }
    }
    builder.profile
}

pub fn write_pprof<W: Write>(
    results: Option<&Results>,
    mut w: W,
    options: &PprofOptions,
) -> ProfilerResult<()> {
    let Some(results) = results else {
        return Ok(());
    };
    let profile = build_profile(results, options);
    w.write_all(&profile.encode_to_vec())?;
    w.flush()?;
    debug!(
        samples = profile.sample.len(),
        locations = profile.location.len(),
        "wrote pprof profile"
    );
    Ok(())
}

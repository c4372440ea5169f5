// Copyright 2025 Armada Team.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Progress channel injected into composite jobs.

use serde_json::Value;
use std::sync::Mutex;

pub trait Reporter: Send + Sync {
    /// Start of a job step.
    fn heading(&self, title: &str);

    fn message(&self, text: &str);

    /// A structured record, such as a provider response.
    fn data(&self, label: &str, value: &Value);

    fn warning(&self, text: &str);

    fn error(&self, text: &str);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn heading(&self, _title: &str) {}

    fn message(&self, _text: &str) {}

    fn data(&self, _label: &str, _value: &Value) {}

    fn warning(&self, _text: &str) {}

    fn error(&self, _text: &str) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    Heading(String),
    Message(String),
    Data(String, Value),
    Warning(String),
    Error(String),
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn headings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::Heading(title) => Some(title),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ReportEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Reporter for MemoryReporter {
    fn heading(&self, title: &str) {
        self.push(ReportEvent::Heading(title.to_string()));
    }

    fn message(&self, text: &str) {
        self.push(ReportEvent::Message(text.to_string()));
    }

    fn data(&self, label: &str, value: &Value) {
        self.push(ReportEvent::Data(label.to_string(), value.clone()));
    }

    fn warning(&self, text: &str) {
        self.push(ReportEvent::Warning(text.to_string()));
    }

    fn error(&self, text: &str) {
        self.push(ReportEvent::Error(text.to_string()));
    }
}

/*!
# Student Recommendation Viewer

A small web dashboard that shows each student the job recommendations computed for them.

## Overview

The recommendations arrive as a delimited text file whose character encoding and
field delimiter are not known in advance. The viewer works them out, types every
row, and serves a per-student report behind a simple shared-password login.

## Architecture

### Ingestion Layer
- **Resolver** (`loader`) - Tries cp949, euc-kr, utf-8-sig and utf-8, each with tab,
  comma and semicolon, and keeps the first combination giving at least ten columns
- **Table** (`table`) - Ordered named columns with text, numeric and missing cells
- **Records** (`record`) - Typed recommendation rows and the job link lookup
- **Data service** (`service`) - Loads both files once; read-only afterwards

### Presentation Layer
- **Technologies**: Rust, axum, handlebars, plotters
- **Key Components**:
  - Report builder (`report`) - Filtering by student, rank ordering, statistics
  - Charts (`graph`) - Final score bar chart and score breakdown radar chart
  - Downloads (`downloader`) - CSV (UTF-8 with BOM) and XLSX exports
  - Login (`login`) - Shared-secret gate and per-browser session context
  - Routing (`app`) - HTTP handlers and templates

## HTTP Endpoints

- `/login` - Login form and submission
- `/logout` - End the session
- `/dashboard` - The logged-in student's report
- `/dashboard/details/{rank}` - Open or close a card's detail scores
- `/dashboard/charts/final-scores.png`, `/dashboard/charts/score-profile.png` - Chart images
- `/dashboard/export.csv`, `/dashboard/export.xlsx` - Downloads
*/

pub mod config;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod record;
pub mod report;
pub mod service;
pub mod table;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod graph;
#[cfg(feature = "web")]
pub mod login;

pub use error::{ExportError, IngestError};
pub use record::{ApplyLink, JobLinks, Recommendation, ScoreKind};
pub use service::{DataService, Dataset};
pub use table::{Table, Value};

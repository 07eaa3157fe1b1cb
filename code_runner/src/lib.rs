//! The Grading Pipeline.
//!
//! A submitted artifact (one `.java` file or a `.zip` of them) is unpacked into
//! a private temporary workspace, its public classes are renamed to unique
//! names, the sources are compiled together and, when the assignment is
//! graded, the entry point is run once per test case. Pass/fail outcomes are
//! [`Verdict`]s; [`GradingError`] is reserved for infrastructure failures.

pub mod error;
pub mod grader;
pub mod normalize;
pub mod process;
pub mod testcases;
pub mod toolchain;

pub use error::GradingError;
pub use grader::{GradeRequest, Grader, Verdict};
pub use testcases::{FsTestCases, TestCase, TestCaseSource};
pub use toolchain::{JavaToolchain, Toolchain};

//! JUnit XML 결과 파일 파싱
//!
//! pytest `--junit-xml` 출력 형식을 기준으로 합니다.
//!
//! ```xml
//! <testsuites>
//!   <testsuite name="pytest" tests="5" failures="1" errors="0" skipped="0">
//!     <testcase classname="tests.test_crud" name="test_delete">
//!       <failure message="assert 404 == 204">...</failure>
//!     </testcase>
//!   </testsuite>
//! </testsuites>
//! ```

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ReportError;

/// 실패 사유 최대 길이 (문자 수)
pub const MAX_REASON_CHARS: usize = 200;

/// 실패한 테스트 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    /// `<classname>.<name>`
    pub name: String,
    /// 실패 메시지 (최대 200자)
    pub reason: String,
}

/// 테스트 결과 요약
///
/// 결과 파일이 없으면 [`Default`] 값(모두 0, 실패 목록 비어 있음)을 사용합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultSummary {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub failures: Vec<FailureDetail>,
}

/// 결과 파일을 읽어 요약합니다.
///
/// 파일이 없으면 빈 요약을 반환합니다.
pub async fn parse_results(path: impl AsRef<Path>) -> Result<TestResultSummary, ReportError> {
    let path = path.as_ref();
    let xml = match tokio::fs::read_to_string(path).await {
        Ok(xml) => xml,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no junit result file, using empty summary");
            return Ok(TestResultSummary::default());
        }
        Err(e) => {
            return Err(ReportError::Io {
                path: path.display().to_string(),
                source: e,
            });
        }
    };

    parse_document(&xml).map_err(|reason| ReportError::Parse {
        path: path.display().to_string(),
        reason,
    })
}

/// 메모리상의 JUnit XML 문서를 요약합니다.
pub fn parse_junit(xml: &str) -> Result<TestResultSummary, ReportError> {
    parse_document(xml).map_err(|reason| ReportError::Parse {
        path: "<inline>".to_owned(),
        reason,
    })
}

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    tests: u64,
    failures: u64,
    errors: u64,
}

impl Counts {
    fn read(e: &BytesStart<'_>) -> Result<Self, String> {
        Ok(Self {
            tests: count_attr(e, b"tests")?,
            failures: count_attr(e, b"failures")?,
            errors: count_attr(e, b"errors")?,
        })
    }

    fn add(&mut self, other: Counts) {
        self.tests = self.tests.saturating_add(other.tests);
        self.failures = self.failures.saturating_add(other.failures);
        self.errors = self.errors.saturating_add(other.errors);
    }
}

struct OpenCase {
    name: String,
    recorded: bool,
}

fn parse_document(xml: &str) -> Result<TestResultSummary, String> {
    let mut reader = Reader::from_str(xml);

    let mut root: Option<Counts> = None;
    let mut suites: Option<Counts> = None;
    let mut suite_depth: usize = 0;
    let mut depth: usize = 0;
    let mut saw_element = false;
    let mut case: Option<OpenCase> = None;
    let mut failures = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("{e} at byte {}", reader.buffer_position()))?;
        match event {
            Event::Start(e) => {
                saw_element = true;
                depth += 1;
                match e.local_name().as_ref() {
                    b"testsuites" if depth == 1 => root = Some(Counts::read(&e)?),
                    b"testsuite" => {
                        if suite_depth == 0 {
                            suites.get_or_insert_with(Counts::default).add(Counts::read(&e)?);
                        }
                        suite_depth += 1;
                    }
                    b"testcase" => {
                        case = Some(OpenCase {
                            name: case_name(&e)?,
                            recorded: false,
                        })
                    }
                    b"failure" | b"error" => record_failure(&e, case.as_mut(), &mut failures)?,
                    _ => {}
                }
            }
            Event::Empty(e) => {
                saw_element = true;
                match e.local_name().as_ref() {
                    b"testsuites" if depth == 0 => root = Some(Counts::read(&e)?),
                    b"testsuite" if suite_depth == 0 => {
                        suites.get_or_insert_with(Counts::default).add(Counts::read(&e)?)
                    }
                    b"failure" | b"error" => record_failure(&e, case.as_mut(), &mut failures)?,
                    _ => {}
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                match e.local_name().as_ref() {
                    b"testsuite" => suite_depth = suite_depth.saturating_sub(1),
                    b"testcase" => case = None,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_element {
        return Err("document has no root element".to_owned());
    }
    if depth != 0 {
        return Err("unexpected end of document (unclosed element)".to_owned());
    }

    let counts = suites.or(root).unwrap_or_default();
    let failed = counts.failures.saturating_add(counts.errors);
    Ok(TestResultSummary {
        total: counts.tests,
        passed: counts.tests.saturating_sub(failed),
        failed,
        failures,
    })
}

fn record_failure(
    e: &BytesStart<'_>,
    case: Option<&mut OpenCase>,
    failures: &mut Vec<FailureDetail>,
) -> Result<(), String> {
    // testcase 밖의 failure/error, 또는 같은 testcase의 두 번째 항목은 무시
    let Some(case) = case else {
        return Ok(());
    };
    if case.recorded {
        return Ok(());
    }
    case.recorded = true;

    let message = attr(e, b"message")?.unwrap_or_default();
    failures.push(FailureDetail {
        name: case.name.clone(),
        reason: truncate_chars(&message, MAX_REASON_CHARS),
    });
    Ok(())
}

fn case_name(e: &BytesStart<'_>) -> Result<String, String> {
    let name = attr(e, b"name")?.unwrap_or_default();
    Ok(match attr(e, b"classname")? {
        Some(classname) if !classname.is_empty() => format!("{classname}.{name}"),
        _ => name,
    })
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, String> {
    for attribute in e.attributes() {
        let attribute = attribute.map_err(|err| err.to_string())?;
        if attribute.key.as_ref() == key {
            let value = attribute.unescape_value().map_err(|err| err.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn count_attr(e: &BytesStart<'_>, key: &[u8]) -> Result<u64, String> {
    match attr(e, key)? {
        None => Ok(0),
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
            format!(
                "attribute '{}' is not a count: '{raw}'",
                String::from_utf8_lossy(key)
            )
        }),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_owned(),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PYTEST_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<testsuites>
  <testsuite name="pytest" errors="0" failures="1" skipped="0" tests="5" time="1.234">
    <testcase classname="tests.test_health" name="test_health_ok" time="0.01" />
    <testcase classname="tests.test_crud" name="test_create" time="0.02" />
    <testcase classname="tests.test_crud" name="test_read" time="0.02" />
    <testcase classname="tests.test_crud" name="test_update" time="0.02" />
    <testcase classname="tests.test_crud" name="test_delete" time="0.02">
      <failure message="assert 404 == 204">tests/test_crud.py:42: AssertionError</failure>
    </testcase>
  </testsuite>
</testsuites>
"#;

    #[test]
    fn five_total_one_failure() {
        let summary = parse_junit(PYTEST_XML).unwrap();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.passed, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            summary.failures,
            vec![FailureDetail {
                name: "tests.test_crud.test_delete".to_owned(),
                reason: "assert 404 == 204".to_owned(),
            }]
        );
    }

    #[test]
    fn errors_count_as_failures() {
        let xml = r#"<testsuite tests="3" failures="1" errors="1">
            <testcase classname="a" name="one"><failure message="boom"/></testcase>
            <testcase classname="a" name="two"><error message="fixture failed"/></testcase>
            <testcase classname="a" name="three"/>
        </testsuite>"#;
        let summary = parse_junit(xml).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.passed, 1);
        let names: Vec<&str> = summary.failures.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.one", "a.two"]);
        assert_eq!(summary.failures[1].reason, "fixture failed");
    }

    #[test]
    fn totals_are_summed_over_suites() {
        let xml = r#"<testsuites tests="99">
            <testsuite tests="2" failures="0" errors="0"/>
            <testsuite tests="3" failures="1" errors="1"/>
        </testsuites>"#;
        let summary = parse_junit(xml).unwrap();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.passed, 3);
    }

    #[test]
    fn nested_suites_are_not_double_counted() {
        let xml = r#"<testsuites>
            <testsuite tests="4" failures="1">
                <testsuite tests="4" failures="1"/>
            </testsuite>
        </testsuites>"#;
        let summary = parse_junit(xml).unwrap();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn falls_back_to_root_attributes() {
        let xml = r#"<testsuites tests="7" failures="2" errors="0"></testsuites>"#;
        let summary = parse_junit(xml).unwrap();
        assert_eq!(summary.total, 7);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.passed, 5);
    }

    #[test]
    fn passed_saturates_at_zero() {
        let xml = r#"<testsuite tests="1" failures="2" errors="1"/>"#;
        let summary = parse_junit(xml).unwrap();
        assert_eq!(summary.passed, 0);
        assert_eq!(summary.failed, 3);
    }

    #[test]
    fn reason_is_truncated_to_200_chars() {
        let long = "é".repeat(300);
        let xml = format!(
            r#"<testsuite tests="1" failures="1"><testcase classname="c" name="n"><failure message="{long}"/></testcase></testsuite>"#
        );
        let summary = parse_junit(&xml).unwrap();
        assert_eq!(summary.failures[0].reason.chars().count(), 200);
    }

    #[test]
    fn escaped_message_is_unescaped() {
        let xml = r#"<testsuite tests="1" failures="1"><testcase classname="c" name="n"><failure message="expected &lt;200&gt; &amp; got 500"/></testcase></testsuite>"#;
        let summary = parse_junit(xml).unwrap();
        assert_eq!(summary.failures[0].reason, "expected <200> & got 500");
    }

    #[test]
    fn missing_classname_uses_bare_name() {
        let xml = r#"<testsuite tests="1" failures="1"><testcase name="lonely"><failure/></testcase></testsuite>"#;
        let summary = parse_junit(xml).unwrap();
        assert_eq!(summary.failures[0].name, "lonely");
        assert_eq!(summary.failures[0].reason, "");
    }

    #[test]
    fn one_entry_per_testcase() {
        let xml = r#"<testsuite tests="1" failures="1" errors="1">
            <testcase classname="c" name="n">
                <failure message="first"/>
                <error message="teardown"/>
            </testcase>
        </testsuite>"#;
        let summary = parse_junit(xml).unwrap();
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].reason, "first");
    }

    #[test]
    fn malformed_documents_are_errors() {
        assert!(parse_junit("").is_err());
        assert!(parse_junit("not xml at all").is_err());
        assert!(parse_junit("<testsuite tests=\"1\">").is_err());
        assert!(parse_junit("<testsuite></testcase>").is_err());
        assert!(matches!(
            parse_junit(r#"<testsuite tests="many"/>"#),
            Err(ReportError::Parse { .. })
        ));
    }

    #[test]
    fn truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("한글테스트", 2), "한글");
    }

    #[tokio::test]
    async fn missing_file_yields_empty_summary() {
        let tmp = tempfile::tempdir().unwrap();
        let summary = parse_results(tmp.path().join("reports/junit.xml"))
            .await
            .unwrap();
        assert_eq!(summary, TestResultSummary::default());
        assert_eq!(summary.total, 0);
        assert!(summary.failures.is_empty());
    }

    #[tokio::test]
    async fn malformed_file_is_parse_error_with_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("junit.xml");
        std::fs::write(&path, "<testsuites><testsuite>").unwrap();
        let err = parse_results(&path).await.unwrap_err();
        match err {
            ReportError::Parse { path: p, .. } => assert!(p.ends_with("junit.xml")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}

use cmdsession_core::builtins::{render_history, Builtin, CommandParser, CommandType};
use cmdsession_core::{ExecutionResult, SessionEvent};
use std::path::PathBuf;

// ============================================================================
// ExecutionResult Tests
// ============================================================================

#[test]
fn test_execution_result_empty() {
    let result = ExecutionResult::empty();
    assert_eq!(result.exit_code, 0);
    assert!(result.combined_output.is_empty());
    assert!(result.is_success());
}

#[test]
fn test_execution_result_nonzero_is_not_success() {
    let result = ExecutionResult::new(2, "boom");
    assert!(!result.is_success());
    assert_eq!(result.combined_output, "boom");
}

#[test]
fn test_execution_result_serialization() {
    let result = ExecutionResult::new(0, "hello\n");
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"exit_code\":0"));
    let deserialized: ExecutionResult = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, result);
}

// ============================================================================
// SessionEvent Tests
// ============================================================================

#[test]
fn test_session_event_output() {
    let event = SessionEvent::Output(vec![104, 105]);
    match event {
        SessionEvent::Output(bytes) => assert_eq!(bytes, b"hi"),
        _ => panic!("Expected Output variant"),
    }
}

#[test]
fn test_session_event_directory_changed() {
    let event = SessionEvent::DirectoryChanged(PathBuf::from("/tmp"));
    assert_eq!(event, SessionEvent::DirectoryChanged(PathBuf::from("/tmp")));
}

// ============================================================================
// CommandParser Tests
// ============================================================================

#[test]
fn test_parse_shell_command_kept_verbatim() {
    let result = CommandParser::parse("  ls -la  ");
    assert_eq!(result, CommandType::Shell("  ls -la  ".to_string()));
}

#[test]
fn test_parse_history() {
    assert_eq!(
        CommandParser::parse("history"),
        CommandType::Builtin(Builtin::History)
    );
    assert_eq!(
        CommandParser::parse("  history "),
        CommandType::Builtin(Builtin::History)
    );
}

#[test]
fn test_parse_history_with_args_goes_to_shell() {
    assert_eq!(
        CommandParser::parse("history 5"),
        CommandType::Shell("history 5".to_string())
    );
}

#[test]
fn test_parse_clear() {
    assert_eq!(
        CommandParser::parse("clear"),
        CommandType::Builtin(Builtin::Clear)
    );
}

#[test]
fn test_parse_cd_with_path() {
    assert_eq!(
        CommandParser::parse("cd /tmp"),
        CommandType::Builtin(Builtin::Cd("/tmp".to_string()))
    );
}

#[test]
fn test_parse_bare_cd() {
    assert_eq!(
        CommandParser::parse("cd"),
        CommandType::Builtin(Builtin::Cd(String::new()))
    );
}

#[test]
fn test_parse_cd_quoted_path() {
    assert_eq!(
        CommandParser::parse("cd \"My Documents\""),
        CommandType::Builtin(Builtin::Cd("My Documents".to_string()))
    );
    assert_eq!(
        CommandParser::parse("cd 'a b'"),
        CommandType::Builtin(Builtin::Cd("a b".to_string()))
    );
}

#[test]
fn test_parse_cd_unquoted_spaces_kept() {
    assert_eq!(
        CommandParser::parse("cd My Documents"),
        CommandType::Builtin(Builtin::Cd("My Documents".to_string()))
    );
}

#[test]
fn test_parse_cd_prefix_is_not_cd() {
    assert_eq!(
        CommandParser::parse("cdrom"),
        CommandType::Shell("cdrom".to_string())
    );
}

#[test]
fn test_parse_cd_with_shell_syntax_goes_to_shell() {
    for input in ["cd /tmp && ls", "cd /tmp; pwd", "cd $HOME", "cd `pwd`", "cd a | cat"] {
        assert_eq!(
            CommandParser::parse(input),
            CommandType::Shell(input.to_string()),
            "{} should be delegated",
            input
        );
    }
}

// ============================================================================
// History Rendering Tests
// ============================================================================

#[test]
fn test_render_history_one_indexed() {
    let entries = vec!["ls".to_string(), "cd /tmp".to_string()];
    assert_eq!(render_history(&entries), "    1  ls\n    2  cd /tmp\n");
}

#[test]
fn test_render_history_keeps_duplicates() {
    let entries = vec!["ls".to_string(), "ls".to_string()];
    let rendered = render_history(&entries);
    assert_eq!(rendered.lines().count(), 2);
}

use super::*;
use crate::llm::types::Speaker;

#[test]
fn session_id_parsing() {
    let id = Uuid::new_v4();
    assert_eq!(parse_session_id(Some(&id.to_string())), Some(id));
    assert_eq!(parse_session_id(Some(&format!("  {id} "))), Some(id));
    assert_eq!(parse_session_id(Some("not-a-uuid")), None);
    assert_eq!(parse_session_id(Some("")), None);
    assert_eq!(parse_session_id(None), None);
}

#[test]
fn turns_map_to_llm_roles() {
    let turns = vec![
        ConversationMessage { role: ChatRole::User, content: "plan my week".into(), timestamp: 1 },
        ConversationMessage { role: ChatRole::Assistant, content: "done".into(), timestamp: 2 },
    ];
    let messages = to_llm_messages(&turns);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Speaker::User);
    assert_eq!(messages[1].role, Speaker::Assistant);
    assert_eq!(messages[1].content, "done");
}

#[tokio::test]
async fn open_fails_fast_without_database() {
    let state = crate::state::test_helpers::test_app_state();
    assert!(open(&state.pool, 1, None).await.is_err());
}

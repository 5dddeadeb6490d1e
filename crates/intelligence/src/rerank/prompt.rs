//! Prompt template for cross-encoder-via-chat-completions reranking.

pub const SYSTEM_PROMPT: &str = "\
You are a search relevance scorer. Given a query and numbered bullet texts, \
score each bullet's relevance to the query from 0 to 10.

Output format (one per line, no other text):
1: <score>
2: <score>
...

Rules:
- Score 0 = completely irrelevant, 10 = perfect match
- Output ONLY numbered score lines
- Score every bullet listed";

/// Build the chat-completions messages array for a rerank request.
/// `snippets` is `(original_index, bullet_text)` pairs.
pub fn build_rerank_messages(query: &str, snippets: &[(usize, &str)]) -> serde_json::Value {
    let mut user_content = format!("Query: {query}\n\nBullets:");
    for (i, (_orig_idx, text)) in snippets.iter().enumerate() {
        user_content.push_str(&format!("\n{}. {}", i + 1, text));
    }
    serde_json::json!([
        {"role": "system", "content": SYSTEM_PROMPT},
        {"role": "user", "content": user_content}
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_query_and_numbered_bullets() {
        let snippets = vec![(0, "first"), (1, "second")];
        let messages = build_rerank_messages("q", &snippets);
        let content = messages[1]["content"].as_str().unwrap();
        assert!(content.contains("Query: q"));
        assert!(content.contains("1. first"));
        assert!(content.contains("2. second"));
    }
}

//! Prompt assembly and answer post-processing for the RAG stage.

/// System prompt for grounded answering. The model must answer only from
/// the reference block and say so when it cannot.
pub const SYSTEM_PROMPT: &str = "あなたは研究室の情報を提供するアシスタントです。\n\
以下の参照情報を基に、正確で簡潔な回答を日本語で提供してください。\n\
参照情報にない内容については推測せず、「情報が見つかりませんでした」と回答してください。\n\
重要な情報（鍵番号、パスワード等）は正確に伝えてください。";

/// Append an instruction line keyed to the kind of question.
pub fn enhance_question(question: &str) -> String {
    let mut enhanced = question.to_string();

    if question.contains("鍵") || question.contains("パスワード") {
        enhanced.push_str("\n※セキュリティ情報は正確に伝えてください。");
    } else if question.contains("研究室") && question.contains("どのような") {
        enhanced.push_str("\n※研究室の特徴や研究分野を簡潔にまとめてください。");
    } else if question.contains("誰") || question.contains("メンバー") {
        enhanced.push_str("\n※人物情報は役職や研究テーマも含めて回答してください。");
    }

    enhanced
}

/// The user turn carrying the reference block and the (enhanced) question.
pub fn build_user_message(question: &str, context: &str) -> String {
    format!(
        "以下の参照情報を基に質問に回答してください。\n\n\
         参照情報:\n{context}\n\n\
         質問: {question}\n\n\
         回答:"
    )
}

/// Strip boilerplate prefixes models like to emit and trim whitespace.
pub fn postprocess_answer(answer: &str) -> String {
    const REMOVE_PHRASES: [&str; 3] = [
        "参照情報によると、",
        "参照情報を基に回答します。",
        "以下が回答です：",
    ];

    let mut cleaned = answer.to_string();
    for phrase in REMOVE_PHRASES {
        cleaned = cleaned.replace(phrase, "");
    }
    cleaned.trim().to_string()
}

//! Prompt templates and fixed reply texts for the answering policy

/// Fixed refusal when the knowledge base has nothing relevant.
/// Returned verbatim; the completion provider is not consulted.
pub const REFUSAL_TEXT: &str = "Maaf, saya belum memiliki informasi mengenai hal tersebut \
     dalam basis pengetahuan kami. Silakan hubungi admin untuk bantuan lebih lanjut.";

/// Fixed apology when retrieval itself failed. Deliberately different
/// wording from the refusal so the two cases stay distinguishable.
pub const DEGRADED_TEXT: &str = "Maaf, sistem sedang mengalami gangguan. \
     Silakan coba lagi dalam beberapa saat.";

/// System instructions for a grounded answer: scope restriction plus the
/// formatted context block.
pub fn strict_system_prompt(domain: &str, context: &str) -> String {
    format!(
        "Kamu adalah asisten resmi untuk {domain}. \
         Jawab pertanyaan dalam Bahasa Indonesia dengan sopan, ramah, dan jelas. \
         Gunakan HANYA informasi pada konteks di bawah ini sebagai dasar jawaban. \
         Jika pertanyaan berada di luar cakupan konteks tersebut, tolak dengan sopan \
         dan sarankan pengguna untuk menghubungi admin.\n\n{context}"
    )
}

/// System instructions when answering without the knowledge base
/// (diagnostic mode on the direct chat call).
pub fn ungrounded_system_prompt(domain: &str) -> String {
    format!(
        "Kamu adalah asisten resmi untuk {domain}. \
         Jawab pertanyaan dalam Bahasa Indonesia dengan sopan, ramah, dan jelas."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusal_and_degraded_texts_are_distinct() {
        assert_ne!(REFUSAL_TEXT, DEGRADED_TEXT);
    }

    #[test]
    fn test_strict_prompt_embeds_domain_and_context() {
        let prompt = strict_system_prompt("layanan KSJPS", "Informasi dari knowledge base:\n\n...");
        assert!(prompt.contains("layanan KSJPS"));
        assert!(prompt.contains("Informasi dari knowledge base:"));
        assert!(prompt.contains("HANYA"));
    }

    #[test]
    fn test_ungrounded_prompt_has_no_context_block() {
        let prompt = ungrounded_system_prompt("layanan KSJPS");
        assert!(!prompt.contains("knowledge base"));
    }
}

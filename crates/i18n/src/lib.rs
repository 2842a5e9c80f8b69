use std::collections::BTreeMap;

use core_types::Language;

type Table = BTreeMap<&'static str, &'static str>;

#[derive(Debug, Clone)]
pub struct I18n {
    lang: Language,
    tables: BTreeMap<Language, Table>,
}

impl I18n {
    pub fn new(lang: Language) -> Self {
        Self {
            lang,
            tables: Language::ALL
                .into_iter()
                .map(|lang| (lang, table_for(lang)))
                .collect(),
        }
    }

    pub fn set_language(&mut self, lang: Language) {
        self.lang = lang;
    }

    pub fn language(&self) -> Language {
        self.lang
    }

    /// Looks up `key` in the active language, then English, then returns the key.
    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        lookup(&self.tables, self.lang, key).unwrap_or(key)
    }
}

fn lookup(
    tables: &BTreeMap<Language, Table>,
    lang: Language,
    key: &str,
) -> Option<&'static str> {
    tables
        .get(&lang)
        .and_then(|table| table.get(key).copied())
        .or_else(|| {
            tables
                .get(&Language::En)
                .and_then(|table| table.get(key).copied())
        })
}

fn localized(lang: Language, key: &str) -> &'static str {
    table_for(lang)
        .get(key)
        .copied()
        .or_else(|| table_for(Language::En).get(key).copied())
        .unwrap_or("")
}

/// Canned reply used when a configured completion round trip fails.
pub fn fallback_for(lang: Language) -> &'static str {
    localized(lang, "reply.unavailable")
}

/// Canned reply used when no AI integration has been configured.
pub fn not_configured_notice(lang: Language) -> &'static str {
    localized(lang, "reply.not_configured")
}

pub fn human_handoff_notice(lang: Language) -> &'static str {
    localized(lang, "reply.handoff")
}

pub fn welcome_message(first_name: Option<&str>) -> String {
    let name = first_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("there");
    format!(
        "Hello {name}! I am your campus assistant. I can help you with queries about fees, \
         scholarships, timetables, and more. Please select your preferred language."
    )
}

const SAMPLE_QUERIES_EN: [&str; 4] = [
    "What are the fee payment deadlines?",
    "How do I apply for scholarships?",
    "When is the next semester starting?",
    "What documents are needed for admission?",
];

const SAMPLE_QUERIES_HI: [&str; 4] = [
    "फीस भुगतान की अंतिम तारीख क्या है?",
    "छात्रवृत्ति के लिए कैसे आवेदन करें?",
    "अगला सेमेस्टर कब शुरू होगा?",
    "प्रवेश के लिए कौन से दस्तावेज चाहिए?",
];

pub fn sample_queries(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Hi => &SAMPLE_QUERIES_HI,
        _ => &SAMPLE_QUERIES_EN,
    }
}

fn table_for(lang: Language) -> Table {
    match lang {
        Language::En => en_map(),
        Language::Hi => hi_map(),
        Language::Mr => mr_map(),
        Language::Te => te_map(),
        Language::Ta => ta_map(),
    }
}

fn en_map() -> Table {
    BTreeMap::from([
        ("app.title", "Campus Assistant"),
        ("chat.placeholder", "Type your question..."),
        ("chat.typing", "Assistant is typing..."),
        ("chat.quick_queries", "Quick queries"),
        ("chat.language_changed", "Language changed"),
        (
            "reply.unavailable",
            "I'm sorry, I'm having trouble connecting to my knowledge base right now. \
             Please try again in a moment, or contact the campus help desk for immediate assistance.",
        ),
        (
            "reply.not_configured",
            "AI service is not configured. Please contact the administrator to set up the AI integration.",
        ),
        (
            "reply.handoff",
            "I'm connecting you to our human assistant. Please wait or call 📞 +91-XXX-XXXX-XXX for immediate help.",
        ),
        ("config.saved", "AI configuration saved"),
        ("config.missing_credential", "Please enter your API key"),
        ("config.test_ok", "Connection successful"),
        ("config.test_failed", "Connection failed"),
        ("voice.unsupported", "Voice features not supported in this browser"),
        ("voice.start", "Start voice input"),
        ("voice.stop", "Stop listening"),
        ("voice.listening", "Listening... Tap to stop"),
        ("voice.speaking", "Speaking..."),
        ("voice.auto_speak_on", "Auto-speak enabled"),
        ("voice.auto_speak_off", "Auto-speak disabled"),
    ])
}

fn hi_map() -> Table {
    BTreeMap::from([
        ("app.title", "कैंपस सहायक"),
        ("chat.placeholder", "अपना प्रश्न लिखें..."),
        ("chat.typing", "सहायक लिख रहा है..."),
        ("chat.quick_queries", "त्वरित प्रश्न"),
        ("chat.language_changed", "भाषा बदली गई"),
        (
            "reply.unavailable",
            "मुझे खुशी है कि आपने पूछा, लेकिन अभी मुझे अपने ज्ञान आधार से जुड़ने में समस्या हो रही है। कृपया कुछ देर बाद पुनः प्रयास करें।",
        ),
        (
            "reply.not_configured",
            "AI सेवा कॉन्फ़िगर नहीं है। कृपया व्यवस्थापक से संपर्क करें।",
        ),
        (
            "reply.handoff",
            "मैं आपको हमारे सहायक से जोड़ रहा हूं। कृपया प्रतीक्षा करें या 📞 +91-XXX-XXXX-XXX पर कॉल करें।",
        ),
        ("voice.unsupported", "इस ब्राउज़र में आवाज़ सुविधाएँ समर्थित नहीं हैं"),
        ("voice.listening", "सुन रहा हूं... रोकने के लिए टैप करें"),
    ])
}

fn mr_map() -> Table {
    BTreeMap::from([
        (
            "reply.unavailable",
            "मला माफ करा, मला सध्या माझ्या ज्ञान आधाराशी जोडण्यात अडचण येत आहे. कृपया काही वेळानंतर पुन्हा प्रयत्न करा.",
        ),
        (
            "reply.not_configured",
            "AI सेवा कॉन्फिगर केलेली नाही. कृपया प्रशासकाशी संपर्क साधा.",
        ),
    ])
}

fn te_map() -> Table {
    BTreeMap::from([
        (
            "reply.unavailable",
            "క్షమించండి, ప్రస్తుతం నా జ్ఞాన స్థావరంతో కనెక్ట్ అవ్వడంలో సమస్య ఉంది. దయచేసి కొంత సమయం తర్వాత మళ్లీ ప్రయత్నించండి.",
        ),
        (
            "reply.not_configured",
            "AI సేవ కాన్ఫిగర్ చేయబడలేదు. దయచేసి నిర్వాహకుడిని సంప్రదించండి.",
        ),
    ])
}

fn ta_map() -> Table {
    BTreeMap::from([
        (
            "reply.unavailable",
            "மன்னிக்கவும், தற்போது எனது அறிவுத் தளத்துடன் இணைப்பதில் சிக்கல் உள்ளது. தயவுசெய்து சிறிது நேரம் கழித்து மீண்டும் முயற்சிக்கவும்.",
        ),
        (
            "reply.not_configured",
            "AI சேவை கட்டமைக்கப்படவில்லை. தயவுசெய்து நிர்வாகியைத் தொடர்பு கொள்ளவும்.",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_hindi_translation() {
        let i18n = I18n::new(Language::Hi);
        assert_eq!(i18n.t("chat.quick_queries"), "त्वरित प्रश्न");
    }

    #[test]
    fn falls_back_to_english_then_key() {
        let i18n = I18n::new(Language::Ta);
        assert_eq!(i18n.t("voice.start"), "Start voice input");
        assert_eq!(i18n.t("not.exists"), "not.exists");
    }

    #[test]
    fn every_language_has_its_own_fallback_reply() {
        let mut replies: Vec<_> = Language::ALL.into_iter().map(fallback_for).collect();
        assert!(replies.iter().all(|reply| !reply.is_empty()));
        replies.sort_unstable();
        replies.dedup();
        assert_eq!(replies.len(), Language::ALL.len());
    }

    #[test]
    fn unmapped_code_uses_english_fallback() {
        assert_eq!(
            fallback_for(Language::from_code_lossy("fr")),
            fallback_for(Language::En)
        );
        assert!(fallback_for(Language::En).starts_with("I'm sorry"));
    }

    #[test]
    fn not_configured_notice_differs_from_unavailable_reply() {
        for lang in Language::ALL {
            assert!(!not_configured_notice(lang).is_empty());
            assert_ne!(not_configured_notice(lang), fallback_for(lang));
        }
    }

    #[test]
    fn handoff_notice_defaults_to_english() {
        assert!(human_handoff_notice(Language::Hi).contains("सहायक"));
        assert_eq!(
            human_handoff_notice(Language::Te),
            human_handoff_notice(Language::En)
        );
    }

    #[test]
    fn welcome_uses_first_name_or_generic_greeting() {
        assert!(welcome_message(Some("Asha")).starts_with("Hello Asha!"));
        assert!(welcome_message(None).starts_with("Hello there!"));
        assert!(welcome_message(Some(" ")).starts_with("Hello there!"));
    }

    #[test]
    fn sample_queries_exist_for_hindi_and_default_to_english() {
        assert_eq!(sample_queries(Language::Hi).len(), 4);
        assert_eq!(sample_queries(Language::Mr), sample_queries(Language::En));
    }
}

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::*;

/// Gateway returning canned outcomes and recording what it was asked.
#[derive(Debug, Default)]
struct StubAssistant {
    answer: Option<AssistAnswer>,
    translation: Option<TranslationPayload>,
    assist_requests: Mutex<Vec<AssistRequest>>,
    translate_calls: Mutex<u32>,
}

impl StubAssistant {
    fn answering(answer: AssistAnswer) -> Self {
        Self {
            answer: Some(answer),
            ..Self::default()
        }
    }

    fn translating(payload: TranslationPayload) -> Self {
        Self {
            translation: Some(payload),
            ..Self::default()
        }
    }

    fn last_request(&self) -> AssistRequest {
        self.assist_requests
            .lock()
            .expect("stub mutex poisoned")
            .last()
            .cloned()
            .expect("assist was called")
    }

    fn translate_calls(&self) -> u32 {
        *self.translate_calls.lock().expect("stub mutex poisoned")
    }
}

#[async_trait]
impl AssistantGateway for StubAssistant {
    async fn assist(&self, request: &AssistRequest) -> Result<AssistAnswer, AssistantError> {
        self.assist_requests
            .lock()
            .expect("stub mutex poisoned")
            .push(request.clone());
        self.answer
            .clone()
            .ok_or_else(|| AssistantError::Unavailable("model overloaded".to_string()))
    }

    async fn translate(
        &self,
        _request: &TranslationRequest,
    ) -> Result<TranslationPayload, AssistantError> {
        *self.translate_calls.lock().expect("stub mutex poisoned") += 1;
        self.translation.clone().ok_or(AssistantError::RateLimited)
    }
}

fn pro(id: &str, city: &str) -> Professional {
    let mut pro = Professional::new(ProfessionalId(id.to_string()), format!("Pro {id}"));
    pro.professions = vec!["Dentist".to_string()];
    pro.specialties = ["Implants", "Whitening", "Orthodontics", "Children", "Sedation"]
        .iter()
        .map(|tag| tag.to_string())
        .collect();
    pro.cities = vec![city.to_string()];
    pro
}

fn directory(valencia: usize, madrid: usize) -> Vec<Professional> {
    let mut pros: Vec<Professional> = (0..valencia)
        .map(|index| pro(&format!("val-{index}"), "Valencia"))
        .collect();
    pros.extend((0..madrid).map(|index| pro(&format!("mad-{index}"), "Madrid")));
    pros
}

fn ids(pros: &[&Professional]) -> Vec<String> {
    pros.iter().map(|pro| pro.id.0.clone()).collect()
}

#[test]
fn locale_codes_map_to_answer_languages() {
    assert_eq!(language_name("fr-FR"), "French");
    assert_eq!(language_name("es"), "Spanish");
    assert_eq!(language_name("EN-gb"), "English");
    assert_eq!(language_name("de"), "English");
    assert_eq!(language_name(""), "English");
}

#[test]
fn thin_city_is_padded_to_twenty() {
    let pros = directory(3, 30);
    let shortlist = shortlist_candidates(&pros, Some("valencia"));

    assert_eq!(shortlist.len(), 20);
    assert_eq!(&ids(&shortlist)[..3], ["val-0", "val-1", "val-2"]);
}

#[test]
fn busy_city_is_not_padded_and_is_capped() {
    let pros = directory(30, 10);
    let shortlist = shortlist_candidates(&pros, Some("Valencia"));

    assert_eq!(shortlist.len(), 25);
    assert!(shortlist.iter().all(|pro| pro.cities == ["Valencia"]));
}

#[test]
fn address_matches_count_as_city_matches() {
    let mut pros = directory(0, 16);
    pros[15].contact.address = Some("Calle Colon 4, Valencia".to_string());
    let shortlist = shortlist_candidates(&pros, Some("valencia"));

    assert_eq!(shortlist[0].id.0, "mad-15");
    assert_eq!(shortlist.len(), 16);
}

#[tokio::test]
async fn ask_trims_history_and_summarises_candidates() {
    let stub = Arc::new(StubAssistant::answering(AssistAnswer {
        answer: "This expert handles children's dentistry.".to_string(),
        suggestions: vec![Suggestion {
            profession: "Dentist".to_string(),
            city: Some("Madrid".to_string()),
        }],
        recommended_ids: vec![ProfessionalId("mad-1".to_string())],
    }));
    let concierge = ConciergeService::new(stub.clone());
    let history: Vec<ChatTurn> = (0..10)
        .map(|turn| ChatTurn::user(format!("turn {turn}")))
        .collect();

    let reply = concierge.ask(
        "  My son needs braces ",
        &directory(0, 3),
        "fr-FR",
        &history,
        None,
    )
    .await;

    assert!(!reply.degraded);
    assert_eq!(reply.recommended_ids, vec![ProfessionalId("mad-1".to_string())]);
    let request = stub.last_request();
    assert_eq!(request.query, "My son needs braces");
    assert_eq!(request.language, "French");
    assert_eq!(request.history.len(), 6);
    assert_eq!(request.history[0].text, "turn 4");
    assert_eq!(request.candidates.len(), 3);
    assert_eq!(request.candidates[0].specialties.len(), 4);
    assert_eq!(request.candidates[0].profession.as_deref(), Some("Dentist"));
}

#[tokio::test]
async fn unknown_recommendations_are_dropped() {
    let stub = Arc::new(StubAssistant::answering(AssistAnswer {
        answer: String::new(),
        suggestions: Vec::new(),
        recommended_ids: vec![
            ProfessionalId("mad-0".to_string()),
            ProfessionalId("invented-7".to_string()),
        ],
    }));
    let concierge = ConciergeService::new(stub);

    let reply = concierge
        .ask("dentist", &directory(0, 2), "en", &[], Some("Madrid"))
        .await;

    assert_eq!(reply.recommended_ids, vec![ProfessionalId("mad-0".to_string())]);
    assert_eq!(reply.answer, DEFAULT_ANSWER);
}

#[tokio::test]
async fn gateway_failure_degrades_to_the_canned_answer() {
    let concierge = ConciergeService::new(Arc::new(StubAssistant::default()));

    let reply = concierge
        .ask("dentist", &directory(1, 1), "es", &[], None)
        .await;

    assert!(reply.degraded);
    assert_eq!(reply.answer, FALLBACK_ANSWER);
    assert!(reply.recommended_ids.is_empty());
}

#[tokio::test]
async fn short_bio_without_specialties_skips_the_model() {
    let stub = Arc::new(StubAssistant::default());
    let concierge = ConciergeService::new(stub.clone());

    let translations = concierge.translate_profile("Hola", &[]).await;

    assert_eq!(stub.translate_calls(), 0);
    for code in SUPPORTED_LANGUAGES {
        assert_eq!(translations.bios[code], "Hola");
        assert!(translations.specialties[code].is_empty());
    }
}

#[tokio::test]
async fn translation_failure_copies_the_original_everywhere() {
    let stub = Arc::new(StubAssistant::default());
    let concierge = ConciergeService::new(stub.clone());
    let specialties = vec!["Tax returns".to_string()];

    let translations = concierge
        .translate_profile("Chartered accountant for non-residents.", &specialties)
        .await;

    assert_eq!(stub.translate_calls(), 1);
    assert_eq!(translations.bios["fr"], "Chartered accountant for non-residents.");
    assert_eq!(translations.specialties["es"]["Tax returns"], "Tax returns");
}

#[tokio::test]
async fn translated_payload_fills_gaps_with_the_original() {
    let mut bios = BTreeMap::new();
    bios.insert("en".to_string(), "Chartered accountant.".to_string());
    bios.insert("es".to_string(), "Contable colegiado.".to_string());
    let stub = Arc::new(StubAssistant::translating(TranslationPayload {
        bios,
        specialty_list: vec![SpecialtyTranslation {
            original: "Tax returns".to_string(),
            en: "Tax returns".to_string(),
            fr: "Declarations fiscales".to_string(),
            es: String::new(),
        }],
    }));
    let concierge = ConciergeService::new(stub);

    let translations = concierge
        .translate_profile("Chartered accountant.", &["Tax returns".to_string()])
        .await;

    assert_eq!(translations.bios["es"], "Contable colegiado.");
    assert_eq!(translations.bios["fr"], "Chartered accountant.");
    assert_eq!(translations.specialties["fr"]["Tax returns"], "Declarations fiscales");
    assert_eq!(translations.specialties["es"]["Tax returns"], "Tax returns");
}

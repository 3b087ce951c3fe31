use hangul_srs::{
    Catalog, Clock, FixedClock, JsonFileStore, Rating, SessionConfig, StudySession, SystemClock,
};

const CATALOG: &str = r#"[
    {"id": 1, "sourceText": "안녕하세요", "romanization": "annyeonghaseyo", "targetText": "Hello",
     "sourceAudio": "audio/hello_ko.mp3", "targetAudio": "audio/hello_en.mp3"},
    {"id": 2, "sourceText": "안녕", "romanization": "annyeong", "targetText": "Hi / Hello (casual)"},
    {"id": 3, "sourceText": "감사합니다", "romanization": "gamsahamnida", "targetText": "Thank you"},
    {"id": 4, "sourceText": "죄송합니다", "romanization": "joesonghamnida", "targetText": "I'm sorry"},
    {"id": 5, "sourceText": "네", "romanization": "ne", "targetText": "Yes"},
    {"id": 6, "sourceText": "아니요", "romanization": "aniyo", "targetText": "No"}
]"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{}] {}", record.level(), message))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stdout())
        .apply()?;

    let dir = std::env::temp_dir().join("hangul-srs-demo");
    let store = JsonFileStore::open(&dir)?;
    let catalog = Catalog::from_json_str(CATALOG)?;
    let clock = FixedClock::new(SystemClock.today());
    let mut session = StudySession::open(SessionConfig::default(), store, clock, catalog)?;

    // Simulate a week: answer every card, then move to the next day
    let answers = [Rating::Medium, Rating::Easy, Rating::Hard];
    for day in 0..7 {
        println!("day {day}: {} cards", session.deck().len());
        let mut turn = 0;
        while let Some(item) = session.next_item() {
            let (id, front, back) = (item.id, item.source_text.clone(), item.target_text.clone());
            let rating = answers[(id as usize + day) % answers.len()];
            let outcome = session.rate(id, rating);
            println!(
                "  {front} ({back}) rated {rating}: next review in {} days, tier {}",
                outcome.state.interval, outcome.state.mastery_tier
            );
            turn += 1;
        }
        println!("  {turn} reviews, session complete: {}", session.is_complete());
        session.clock_mut().advance_days(1);
    }

    println!("state written to {}", dir.display());
    Ok(())
}

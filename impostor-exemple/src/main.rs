use env_logger::Env;
use log::info;

use impostor_core::model::generation_input::GenerationInput;
use impostor_core::model::generator::Generator;
use impostor_core::model::registry::NickSpec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Load every user from the "data" directory (one .src file per nick)
    // Aliases come from merge.lst, channel info from meta.info,
    // and usage counters from users.bin when they exist
    let source_dir = std::env::args().nth(1).unwrap_or_else(|| "./data".to_owned());
    let mut app = Generator::new(&source_dir)?;
    if app.is_empty() {
        println!("No usable source in {source_dir}");
        return Ok(());
    }

    // A random author, no seed: starts from one of its first-words pairs
    let input = GenerationInput::new(vec![NickSpec::Random]);
    for i in 0..5 {
        let quote = app.generate(&input);
        println!("Random quote {}: [{}] {}", i + 1, quote.nicks.join(":"), quote.text);
    }

    // Two random authors blended together.
    // Only authors with at least 10 first-words pairs are picked
    let input = GenerationInput::new(vec![NickSpec::Random, NickSpec::Random]).with_random_min_starters(10);
    let quote = app.generate(&input);
    if quote.is_empty() {
        println!("Not enough authors with 10 starters");
    } else {
        println!("Blended quote: [{}] {}", quote.nicks.join(":"), quote.text);
    }

    // Named author with a seed, counted in the usage statistics
    let stats = app.generic_statistics();
    if let Some(biggest) = stats.biggest_users.first() {
        let input = GenerationInput::for_nick(&biggest.nick).with_seed("the");
        let quote = app.generate(&input);
        if quote.is_empty() {
            println!("{} never starts a pair with 'the'", biggest.nick);
        } else {
            println!("Seeded quote: [{}] {}", quote.nicks.join(":"), quote.text);
        }

        if let Some(user) = app.user_statistics(&biggest.nick) {
            println!(
                "{}: {} productions, {} quotes requested, aliases {:?}",
                user.nick,
                user.production_count,
                user.quotes_requested,
                app.user_aliases(&biggest.nick)
            );
        }
    }

    // Unknown authors give an empty quote rather than an error
    let quote = app.generate(&GenerationInput::for_nick("unknown"));
    println!("Unknown author gives an empty quote: {}", quote.is_empty());

    let stats = app.generic_statistics();
    println!("{} users, primary channel {:?}", stats.user_count, stats.source_channels.primary);
    for user in &stats.biggest_users {
        println!("  {}: {} productions", user.nick, user.count);
    }

    app.flush();
    info!("usage counters saved");
    Ok(())
}

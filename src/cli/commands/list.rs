//! List indexed courses.

use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;

pub async fn run_list(settings: Settings) -> anyhow::Result<()> {
    let system = RagSystem::new(&settings)?;
    let analytics = system.analytics().await?;

    if analytics.total_courses == 0 {
        Output::info("No courses indexed yet. Run 'pensum index <path>' first.");
        return Ok(());
    }

    Output::header("Indexed Courses");
    for title in &analytics.course_titles {
        Output::list_item(title);
    }
    println!();
    Output::kv("Total", &analytics.total_courses.to_string());

    Ok(())
}

//! Plain-text rendering of view models for the terminal.

use std::fmt::Write as _;

use course_core::{AppViewModel, GenerationJob, GenerationStatus, Notice, ProgressDisplay, ReceiverView};
use course_engine::Course;
use serde_json::Value;

const BAR_WIDTH: usize = 30;

/// Headline and detail line of the progress indicator, `None` when idle.
pub fn receiver_text(view: &ReceiverView) -> Option<(&'static str, String)> {
    match view.status {
        GenerationStatus::Idle => None,
        GenerationStatus::Running => {
            let topic = view.topic.as_deref().unwrap_or("your course");
            let percent = view.progress.percent().unwrap_or(0);
            Some(("Agents Active", format!("Building \"{topic}\"... ({percent}%)")))
        }
        GenerationStatus::Finalizing => Some(("Almost Ready", "Giving final touches...".to_string())),
        GenerationStatus::Completed => Some(("Course Ready!", "Click to Open".to_string())),
    }
}

pub fn progress_bar(progress: ProgressDisplay) -> String {
    match progress {
        ProgressDisplay::Hidden => String::new(),
        ProgressDisplay::Indeterminate => format!("[{}]", "~".repeat(BAR_WIDTH)),
        ProgressDisplay::Percent(_) | ProgressDisplay::Complete => {
            let percent = usize::from(progress.percent().unwrap_or(0).min(100));
            let filled = percent * BAR_WIDTH / 100;
            format!("[{}{}]", "#".repeat(filled), " ".repeat(BAR_WIDTH - filled))
        }
    }
}

/// One toast line, or `None` when there is nothing to show.
pub fn toast_line(view: &ReceiverView) -> Option<String> {
    let (headline, detail) = receiver_text(view)?;
    Some(format!("{headline} {} {detail}", progress_bar(view.progress)))
}

pub fn notice(notice: Notice) -> String {
    format!("! {}", notice.message())
}

/// One-shot description of the stored job; never changes it.
pub fn status(job: &GenerationJob, view: &ReceiverView) -> String {
    let mut out = format!("status: {}", job.status);
    if let Some(form) = &job.form {
        let _ = write!(
            out,
            "\nsubject: {}\ntopic: {}\nstandard: {}",
            form.subject, form.topic, form.standard
        );
    }
    if let Some(start) = job.start_time {
        let _ = write!(out, "\nstarted: {}", start.to_rfc3339());
    }
    if let Some(line) = toast_line(view) {
        let _ = write!(out, "\n{line}");
    }
    if let Some(course_id) = job.result_course_id {
        let _ = write!(out, "\ncourse: {course_id}");
    }
    if job.is_interrupted() {
        let _ = write!(out, "\nnot started by this session; it will be reset when watched");
    }
    out
}

pub fn course_list(view: &AppViewModel) -> String {
    if view.courses.is_empty() {
        return "No courses yet.".to_string();
    }
    let mut out = String::new();
    for row in &view.courses {
        let badge = if row.is_new { " [NEW]" } else { "" };
        let _ = writeln!(
            out,
            "{:>6}  {} | {} | grade {}{}",
            row.course.id, row.course.topic, row.course.subject, row.course.standard, badge
        );
    }
    out.truncate(out.trim_end().len());
    out
}

pub fn course(course: &Course) -> String {
    let summary = &course.summary;
    let mut out = format!(
        "{} ({}, grade {})\n",
        summary.topic, summary.subject, summary.standard
    );
    if let Some(intro) = course.intro.as_deref().filter(|intro| !intro.trim().is_empty()) {
        let _ = writeln!(out, "\n{}", intro.trim());
    }

    let lessons = sections(&course.lessons);
    if !lessons.is_empty() {
        out.push_str("\nLessons\n");
        for (index, (title, body)) in lessons.iter().enumerate() {
            let _ = writeln!(out, "\n{}. {}\n{}", index + 1, title, body);
        }
    }

    let tests = sections(&course.tests);
    if !tests.is_empty() {
        out.push_str("\nQuizzes\n");
        for (title, body) in &tests {
            let _ = writeln!(out, "\n{title}\n{body}");
        }
    }

    let links: Vec<String> = course.links.iter().filter_map(link).collect();
    if !links.is_empty() {
        out.push_str("\nResources\n");
        for link in links {
            let _ = writeln!(out, "- {link}");
        }
    }

    out.truncate(out.trim_end().len());
    out
}

/// Titled sections from a `{title: body}` map or a list of bodies.
fn sections(value: &Value) -> Vec<(String, String)> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(title, body)| (title.clone(), text(body)))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, body)| (format!("Part {}", index + 1), text(body)))
            .collect(),
        Value::Null => Vec::new(),
        other => vec![(String::new(), text(other))],
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}

fn link(value: &Value) -> Option<String> {
    match value {
        Value::String(url) if !url.trim().is_empty() => Some(url.trim().to_string()),
        Value::Object(map) => {
            let url = map.get("url").and_then(Value::as_str)?;
            match map.get("title").and_then(Value::as_str) {
                Some(title) if !title.is_empty() => Some(format!("{title}: {url}")),
                _ => Some(url.to_string()),
            }
        }
        _ => None,
    }
}

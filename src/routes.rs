//! In-app route table.
//!
//! SYSTEM CONTEXT
//! ==============
//! Maps a URL path to one of the app's pages. The retired vocabulary page
//! redirects to the vocabulary section of the course page; that redirect is
//! resolved before the bootstrap guard runs, and the guard then sees the
//! follow-up navigation. Unknown paths still go through the guard.

use serde::Serialize;

/// A page the app can display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum Route {
    Home,
    Books,
    Courses {
        #[serde(rename = "bookId")]
        book_id: String,
    },
    CourseDetail {
        #[serde(rename = "courseId")]
        course_id: String,
    },
}

impl Route {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Books => "books",
            Self::Courses { .. } => "courses",
            Self::CourseDetail { .. } => "course-detail",
        }
    }

    /// Canonical path of the page.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Books => "/books".to_string(),
            Self::Courses { book_id } => format!("/books/{book_id}/courses"),
            Self::CourseDetail { course_id } => format!("/courses/{course_id}/learn"),
        }
    }
}

/// Outcome of looking a path up in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch {
    Page(Route),
    /// Legacy path; navigate here instead.
    Redirect(String),
    Unknown,
}

/// Resolve `path` (no query or fragment) against the route table.
#[must_use]
pub fn resolve(path: &str) -> RouteMatch {
    let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();
    match segments.as_slice() {
        [] => RouteMatch::Page(Route::Home),
        ["books"] => RouteMatch::Page(Route::Books),
        ["books", book_id, "courses"] => RouteMatch::Page(Route::Courses { book_id: (*book_id).to_string() }),
        ["courses", course_id, "learn"] => {
            RouteMatch::Page(Route::CourseDetail { course_id: (*course_id).to_string() })
        }
        ["courses", course_id, "vocabulary"] => {
            let target = Route::CourseDetail { course_id: (*course_id).to_string() };
            RouteMatch::Redirect(format!("{}#vocabulary", target.path()))
        }
        _ => RouteMatch::Unknown,
    }
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;

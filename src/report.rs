use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::interpret::InterpretedPage;

pub const NOT_DETERMINED: &str = "not determined";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("unable to write annotated image {}: {}", .0.display(), .1)]
    Image(PathBuf, #[source] image::ImageError),

    #[error("unable to write report {}: {}", .0.display(), .1)]
    Text(PathBuf, #[source] std::io::Error),
}

/// Renders the text report for one page: one `question=label` line per
/// question, a blank line, then one `label=count` line per answer label.
pub fn render_report(page: &InterpretedPage) -> String {
    let mut out = String::new();

    for question in 1..=page.question_count() {
        let answer = page
            .breakdown
            .get(question)
            .map_or(NOT_DETERMINED, |label| label.as_str());
        out.push_str(&format!("{}={}\n", question, answer));
    }

    out.push('\n');

    for (label, count) in page.tally.iter() {
        out.push_str(&format!("{}={}\n", label, count));
    }

    out
}

/// Writes `<output_dir>/<basename>` (annotated image, format taken from the
/// extension) and `<output_dir>/<basename>.txt`.
pub fn write_page_outputs(
    output_dir: &Path,
    basename: &str,
    page: &InterpretedPage,
) -> Result<(), ReportError> {
    let image_path = output_dir.join(basename);
    page.annotated
        .save(&image_path)
        .map_err(|e| ReportError::Image(image_path.clone(), e))?;

    let report_path = output_dir.join(format!("{}.txt", basename));
    fs::write(&report_path, render_report(page))
        .map_err(|e| ReportError::Text(report_path.clone(), e))?;

    debug!(
        "wrote {} and {}",
        image_path.display(),
        report_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};
    use imageproc::{drawing::draw_filled_rect_mut, rect::Rect};

    use super::*;
    use crate::debug::ImageDebugWriter;
    use crate::interpret::interpret_page;
    use crate::options::ProcessingOptions;
    use crate::types::{Choice, CoordinateTable};

    fn scored_page() -> InterpretedPage {
        let mut img = RgbImage::from_pixel(300, 300, Rgb([240, 240, 240]));
        draw_filled_rect_mut(&mut img, Rect::at(0, 280).of_size(300, 20), Rgb([10, 10, 10]));
        // Question 1, choice 2 half filled.
        draw_filled_rect_mut(&mut img, Rect::at(92, 42).of_size(8, 16), Rgb([10, 10, 10]));

        let table = CoordinateTable::new(vec![
            vec![Choice::new(50, 50), Choice::new(100, 50)],
            vec![Choice::new(50, 150), Choice::new(100, 150)],
        ]);
        interpret_page(
            img,
            &table,
            &ProcessingOptions::default(),
            &ImageDebugWriter::disabled(),
        )
        .unwrap()
    }

    #[test]
    fn test_render_report() {
        let report = render_report(&scored_page());
        assert_eq!(
            report,
            "1=A\n2=not determined\n\nSA=0\nA=1\nSLA=0\nNAD=0\nSLD=0\nD=0\nSD=0\n"
        );
    }

    #[test]
    fn test_write_page_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let page = scored_page();

        write_page_outputs(dir.path(), "form.png", &page).unwrap();

        let written = image::open(dir.path().join("form.png")).unwrap().into_rgb8();
        assert_eq!(written.dimensions(), (300, 300));
        assert_eq!(
            fs::read_to_string(dir.path().join("form.png.txt")).unwrap(),
            render_report(&page)
        );
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        assert!(matches!(
            write_page_outputs(&missing, "form.png", &scored_page()),
            Err(ReportError::Image(..))
        ));
    }
}

use deck_common::Slide;
use deck_core::SlideParser;
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct SlideShape {
    layout: &'static str,
    title: String,
    points: Vec<String>,
}

fn render(slide: &SlideShape) -> String {
    let mut out = format!("<SECTION layout=\"{}\">\n<H1>{}</H1>\n", slide.layout, slide.title);
    if !slide.points.is_empty() {
        out.push_str("<BULLETS>\n");
        for point in &slide.points {
            out.push_str(&format!("<DIV><H3>{point}</H3><P>{point} detail</P></DIV>\n"));
        }
        out.push_str("</BULLETS>\n");
    }
    out.push_str("<IMG query=\"picture\" />\n</SECTION>\n");
    out
}

fn slide_shape() -> impl Strategy<Value = SlideShape> {
    (
        prop::sample::select(vec!["left", "right", "vertical"]),
        "[A-Za-z][A-Za-z0-9]{0,10}",
        prop::collection::vec("[A-Za-z][a-z0-9]{0,8}", 0..4),
    )
        .prop_map(|(layout, title, points)| SlideShape {
            layout,
            title,
            points,
        })
}

fn one_shot(text: &str) -> Vec<Slide> {
    let mut parser = SlideParser::new();
    parser.parse_chunk(text);
    parser.finalize();
    parser.get_all_slides()
}

proptest! {
    #[test]
    fn growing_chunks_reconstruct_every_slide(
        shapes in prop::collection::vec(slide_shape(), 1..6),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..24),
    ) {
        let text: String = std::iter::once("<PRESENTATION>\n".to_string())
            .chain(shapes.iter().map(render))
            .chain(std::iter::once("</PRESENTATION>".to_string()))
            .collect();

        // markup is ASCII, so every index is a char boundary
        let mut ends: Vec<usize> = cuts.iter().map(|i| i.index(text.len())).collect();
        ends.push(text.len());
        ends.sort_unstable();

        let mut parser = SlideParser::new();
        for &end in &ends {
            parser.parse_chunk(&text[..end]);
            let slides = parser.get_all_slides();
            for slide in slides.iter().rev().skip(1) {
                prop_assert!(!slide.generating);
            }
            // calling again with the same text changes nothing
            parser.parse_chunk(&text[..end]);
            prop_assert_eq!(&parser.get_all_slides(), &slides);
        }
        parser.finalize();

        let slides = parser.get_all_slides();
        prop_assert_eq!(slides.len(), shapes.len());
        prop_assert!(slides.iter().all(|s| !s.generating));
        for (slide, shape) in slides.iter().zip(&shapes) {
            prop_assert_eq!(slide.title(), Some(shape.title.as_str()));
        }
        prop_assert_eq!(slides, one_shot(&text));
    }

    #[test]
    fn slides_at_boundaries_are_a_stable_prefix(
        shapes in prop::collection::vec(slide_shape(), 2..6),
        split in any::<prop::sample::Index>(),
    ) {
        let rendered: Vec<String> = shapes.iter().map(render).collect();
        let at = 1 + split.index(rendered.len() - 1);
        let a: String = rendered[..at].concat();
        let b: String = rendered.concat();

        let mut parser = SlideParser::new();
        parser.parse_chunk(&a);
        let from_a = parser.get_all_slides();
        parser.parse_chunk(&b);
        let from_b = parser.get_all_slides();

        prop_assert_eq!(from_a.len(), at);
        prop_assert_eq!(&from_b[..at], &from_a[..]);
    }

    #[test]
    fn arbitrary_text_never_panics(text in ".{0,200}") {
        let mut parser = SlideParser::new();
        for end in (0..=text.len()).filter(|&i| text.is_char_boundary(i)) {
            parser.parse_chunk(&text[..end]);
        }
        parser.finalize();
        prop_assert!(parser.get_all_slides().iter().all(|s| !s.generating));
    }
}

#[test]
fn reset_then_empty_chunk_is_empty() {
    let mut parser = SlideParser::new();
    parser.parse_chunk("<SECTION><H1>A</H1></SECTION>");
    parser.reset();
    parser.parse_chunk("");
    assert!(parser.get_all_slides().is_empty());
}

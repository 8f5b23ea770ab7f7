use iced::widget::{Container, column, row, text};
use iced::{Element, Length, Theme};
use iced_fastscatter::{MarkerStyle, PointSet, Scatter};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub fn main() {
    tracing_subscriber::fmt::init();

    iced::application(Demo::new, Demo::update, Demo::view)
        .theme(Theme::GruvboxDark)
        .run()
        .unwrap()
}

#[derive(Debug, Clone)]
enum Message {
    SelectionChanged(Option<usize>),
}

struct Demo {
    data: PointSet,
    selected: Option<usize>,
}

impl Demo {
    fn new() -> Self {
        // A handful of gaussian-ish clusters around the origin.
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let centers = [(0.0, 0.0), (6.0, 3.0), (-5.0, 4.0), (2.0, -6.0)];

        let mut x = Vec::with_capacity(200_000);
        let mut y = Vec::with_capacity(200_000);
        for i in 0..200_000 {
            let (cx, cy) = centers[i % centers.len()];
            let spread: f32 = rng.gen_range(0.2..2.0);
            x.push(cx + rng.gen_range(-spread..spread));
            y.push(cy + rng.gen_range(-spread..spread));
        }

        Self {
            data: PointSet::new(&x, &y),
            selected: None,
        }
    }

    fn update(&mut self, message: Message) {
        match message {
            Message::SelectionChanged(selected) => {
                self.selected = selected;
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let selection_info = match self.selected {
            Some(index) => {
                let (x, y) = self.data.position(index).unwrap_or((f32::NAN, f32::NAN));
                format!("Selected: #{index} at ({x:.3}, {y:.3})")
            }
            None => "Selected: none".to_string(),
        };

        let info = column![
            text("Fast Scatter"),
            text(""),
            text("Controls:"),
            text("  Drag: Pan"),
            text("  Scroll: Zoom"),
            text("  Click a point: Select"),
            text("  Click empty space: Clear"),
            text(""),
            text(format!("Points: {}", self.data.len())),
            text(selection_info),
        ]
        .spacing(5);

        let scatter = Scatter::new(&self.data)
            .marker(MarkerStyle::builder().size(3.0).build())
            .selected(self.selected)
            .on_select(Message::SelectionChanged);

        row![
            Container::new(scatter.draw())
                .width(Length::FillPortion(3))
                .height(Length::Fill),
            Container::new(info)
                .width(Length::FillPortion(1))
                .height(Length::Fill)
                .padding(20),
        ]
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
    }
}

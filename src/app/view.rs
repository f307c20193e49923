// SPDX-License-Identifier: GPL-3.0-only

//! Screen rendering

use crate::app::camera_preview::{PreviewWidget, ThumbnailWidget, render_centered};
use crate::app::layout::{ScreenLayout, gallery_cell, gallery_grid};
use crate::app::state::{AppModel, ShutterState};
use crate::backends::camera::types::{CameraStatus, TorchState};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph},
};

/// Focus ring size in cells
const FOCUS_RING_WIDTH: u16 = 5;
const FOCUS_RING_HEIGHT: u16 = 3;

/// Draw the whole screen for the model's current state
pub fn view(model: &AppModel, frame: &mut Frame<'_>) {
    let layout = ScreenLayout::new(frame.area());

    render_top_bar(model, &layout, frame);
    render_preview(model, &layout, frame);
    render_toast(model, &layout, frame);
    render_bottom_bar(model, &layout, frame);

    if model.gallery.is_some() {
        render_gallery(model, &layout, frame);
    }
}

fn render_top_bar(model: &AppModel, layout: &ScreenLayout, frame: &mut Frame<'_>) {
    let bar_style = Style::default().fg(Color::White).bg(Color::DarkGray);
    frame.buffer_mut().set_style(layout.top_bar, bar_style);

    if model.torch_visible() {
        let (label, style) = match model.torch_state {
            TorchState::On => ("[Torch ●]", bar_style.fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            TorchState::Off => ("[Torch ○]", bar_style),
        };
        frame.render_widget(Paragraph::new(label).style(style), layout.torch_button);
    }

    let zoom = model.zoom_state.map(|z| z.zoom_ratio).unwrap_or(1.0);
    let name = model
        .camera
        .as_ref()
        .map(|camera| camera.info.device.name.as_str())
        .unwrap_or("No camera");
    let status = match model.camera_status {
        Some(CameraStatus::Open) | None => "",
        Some(CameraStatus::PendingOpen) | Some(CameraStatus::Opening) => "  opening…",
        Some(CameraStatus::Closing) => "  closing…",
        Some(CameraStatus::Closed) => "  closed",
    };
    let info_x = layout.torch_button.x + layout.torch_button.width + 2;
    let info_area = Rect::new(
        info_x.min(layout.top_bar.x + layout.top_bar.width),
        layout.top_bar.y,
        (layout.top_bar.x + layout.top_bar.width).saturating_sub(info_x),
        layout.top_bar.height,
    );
    let line = Line::from(vec![
        Span::styled(format!("{zoom:.1}×"), bar_style.add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {name}"), bar_style),
        Span::styled(status, bar_style.fg(Color::Gray)),
    ]);
    frame.render_widget(Paragraph::new(line), info_area);
}

fn render_preview(model: &AppModel, layout: &ScreenLayout, frame: &mut Frame<'_>) {
    let placeholder = if !model.permission_granted {
        "Camera access denied"
    } else if model.camera.is_none() {
        "Opening camera…"
    } else {
        "Waiting for camera…"
    };
    frame.render_widget(
        PreviewWidget {
            frame: model.current_frame.as_ref(),
            flash: model.capture_flash,
            placeholder,
        },
        layout.preview,
    );

    if let Some(indicator) = model.focus_indicator {
        let x = indicator
            .column
            .saturating_sub(FOCUS_RING_WIDTH / 2)
            .max(layout.preview.x);
        let y = indicator
            .row
            .saturating_sub(FOCUS_RING_HEIGHT / 2)
            .max(layout.preview.y);
        let ring = Rect::new(x, y, FOCUS_RING_WIDTH, FOCUS_RING_HEIGHT).intersection(layout.preview);
        frame.render_widget(
            Block::bordered().border_style(Style::default().fg(Color::Yellow)),
            ring,
        );
    }
}

fn render_toast(model: &AppModel, layout: &ScreenLayout, frame: &mut Frame<'_>) {
    let Some(toast) = &model.toast else {
        return;
    };
    let width = (toast.text.chars().count() as u16 + 2).min(layout.toast.width);
    let area = Rect::new(
        layout.toast.x + (layout.toast.width - width) / 2,
        layout.toast.y,
        width,
        layout.toast.height,
    );
    frame.render_widget(
        Paragraph::new(format!(" {} ", toast.text))
            .style(Style::default().fg(Color::Black).bg(Color::White)),
        area,
    );
}

fn render_bottom_bar(model: &AppModel, layout: &ScreenLayout, frame: &mut Frame<'_>) {
    let button = |label: String, style: Style| {
        Paragraph::new(label)
            .alignment(Alignment::Center)
            .block(Block::bordered().border_style(style))
            .style(style)
    };

    let count = model.photo_count;
    let label = if count == 1 {
        "1 photo".to_string()
    } else {
        format!("{count} photos")
    };
    frame.render_widget(
        button(label, Style::default().fg(Color::White)),
        layout.photos_button,
    );

    let (symbol, style) = match model.shutter_state() {
        ShutterState::Ready => ("●", Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        ShutterState::Waiting => ("○", Style::default().fg(Color::DarkGray)),
        ShutterState::Busy => ("…", Style::default().fg(Color::Yellow)),
        ShutterState::Unavailable => ("×", Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(button(symbol.to_string(), style), layout.shutter_button);

    frame.render_widget(
        button("All".to_string(), Style::default().fg(Color::White)),
        layout.all_photos_button,
    );
}

fn render_gallery(model: &AppModel, layout: &ScreenLayout, frame: &mut Frame<'_>) {
    let Some(gallery) = &model.gallery else {
        return;
    };
    frame.render_widget(Clear, layout.preview);
    let title = format!(
        " {} ({}) · arrows select · Enter open · Esc back ",
        gallery.source,
        gallery.photos().len()
    );
    frame.render_widget(Block::bordered().title(title), layout.preview);

    let area = layout.gallery_grid_area();
    let (columns, rows) = gallery_grid(area);
    let page = gallery.page(columns as usize * rows as usize);

    for (slot, index) in page.enumerate() {
        let path = &gallery.photos()[index];
        let cell = gallery_cell(area, slot);
        if cell.width < 3 || cell.height < 3 {
            continue;
        }
        let border = if index == gallery.selected() {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let caption = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let block = Block::bordered()
            .border_style(border)
            .title_bottom(Line::from(caption).centered());
        let inner = block.inner(cell);
        frame.render_widget(block, cell);

        match gallery.thumbnail(path) {
            Some(Some(thumbnail)) => frame.render_widget(ThumbnailWidget { thumbnail }, inner),
            Some(None) => render_centered("?", inner, frame.buffer_mut()),
            None => render_centered("…", inner, frame.buffer_mut()),
        }
    }
}

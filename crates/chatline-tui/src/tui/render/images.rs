//! Avatar and thumbnail decoding, painted as half-block cells

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ratatui::buffer::Buffer;
use ratatui::layout::{Rect, Size};
use ratatui::style::{Color, Style};
use tracing::debug;

/// Thumbnails kept by [`CachedImages`] before it starts over
pub const MAX_CACHED_THUMBNAILS: usize = 256;

/// Decodes an image path. Returns `None` on any failure; never errors.
pub trait ImageDecoder {
    fn decode(&self, path: &str) -> Option<DynamicImage>;

    /// `path` decoded and scaled to cover `size` cells, two pixels per cell
    fn thumbnail(&self, path: &str, size: Size) -> Option<Rc<DynamicImage>> {
        if size.width == 0 || size.height == 0 {
            return None;
        }
        let img = self.decode(path)?;
        Some(Rc::new(scale_to_cells(&img, size)))
    }
}

/// Reads images from the local filesystem through the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageDecoder;

impl ImageDecoder for FsImageDecoder {
    fn decode(&self, path: &str) -> Option<DynamicImage> {
        if path.is_empty() {
            return None;
        }
        let path = path.strip_prefix("file://").unwrap_or(path);
        match image::open(path) {
            Ok(img) => Some(img),
            Err(err) => {
                debug!(target: "chatline::image", "failed to decode {}: {}", path, err);
                None
            }
        }
    }
}

/// Decoder that never produces an image, for headless use and tests
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImages;

impl ImageDecoder for NoImages {
    fn decode(&self, _path: &str) -> Option<DynamicImage> {
        None
    }
}

type ThumbnailKey = (String, u16, u16);

/// Remembers thumbnails by path and cell size so a row repainted every frame
/// decodes its images once. Failed decodes are remembered too.
#[derive(Debug, Default)]
pub struct CachedImages<D> {
    inner: D,
    thumbnails: RefCell<HashMap<ThumbnailKey, Option<Rc<DynamicImage>>>>,
}

impl<D: ImageDecoder> CachedImages<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            thumbnails: RefCell::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.thumbnails.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.thumbnails.borrow().is_empty()
    }

    /// Forget everything, e.g. after files on disk changed
    pub fn clear(&self) {
        self.thumbnails.borrow_mut().clear();
    }
}

impl<D: ImageDecoder> ImageDecoder for CachedImages<D> {
    fn decode(&self, path: &str) -> Option<DynamicImage> {
        self.inner.decode(path)
    }

    fn thumbnail(&self, path: &str, size: Size) -> Option<Rc<DynamicImage>> {
        if path.is_empty() {
            return None;
        }
        let key = (path.to_string(), size.width, size.height);
        if let Some(hit) = self.thumbnails.borrow().get(&key) {
            return hit.clone();
        }
        let thumb = self.inner.thumbnail(path, size);
        let mut cache = self.thumbnails.borrow_mut();
        if cache.len() >= MAX_CACHED_THUMBNAILS {
            debug!(target: "chatline::image", "thumbnail cache full, dropping {} entries", cache.len());
            cache.clear();
        }
        cache.insert(key, thumb.clone());
        thumb
    }
}

/// Scale `img` to exactly `size.width` by `size.height * 2` pixels
pub fn scale_to_cells(img: &DynamicImage, size: Size) -> DynamicImage {
    img.resize_exact(
        u32::from(size.width),
        u32::from(size.height) * 2,
        FilterType::Triangle,
    )
}

/// Paint a thumbnail from [`ImageDecoder::thumbnail`] at `area` using `▀`.
/// Cells outside `buf` are skipped, so a partly visible row keeps its scale.
pub fn paint_half_blocks(thumb: &DynamicImage, area: Rect, buf: &mut Buffer) {
    let (width, height) = thumb.dimensions();
    for dy in 0..area.height {
        let top_y = u32::from(dy) * 2;
        if top_y + 1 >= height {
            break;
        }
        for dx in 0..area.width {
            let x = u32::from(dx);
            if x >= width {
                break;
            }
            let Some(cell) = buf.cell_mut((area.x.saturating_add(dx), area.y.saturating_add(dy)))
            else {
                continue;
            };
            let top = thumb.get_pixel(x, top_y);
            let bottom = thumb.get_pixel(x, top_y + 1);
            cell.set_symbol("▀").set_style(
                Style::default()
                    .fg(Color::Rgb(top[0], top[1], top[2]))
                    .bg(Color::Rgb(bottom[0], bottom[1], bottom[2])),
            );
        }
    }
}

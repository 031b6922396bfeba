mod border;
mod canvas;
mod cursor;
mod layout;
mod paginate;
mod placer;
mod recording;
mod table;
mod watermark;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use pdf_writer::types::{CidFontType, FontFlags, LineCapStyle, SystemInfo, UnicodeCmap};
use pdf_writer::{Content, Filter, Name, Pdf, Rect as PdfRect, Ref, Str};

use crate::error::{Error, Result};
use crate::fonts::{FontBook, FontEntry, FontId, FontProgram};
use crate::model::{Color, ImageFormat, ImageSource, PageSize};

pub use border::{BorderEdge, DashLayout, dash_layout, draw_border};
pub use canvas::{Canvas, ContentStream, DrawOp, ImageHandle, StreamMode};
pub use cursor::{Cursor, Rect};
pub use paginate::{Page, PageState, PlacedComponent};
pub use placer::{Frame, PlacedBox, align_x, place_in_frame, place_on_page, resolve_styles};
pub use recording::{RecordedPage, RecordedStream, Recording, RecordingCanvas};

pub(crate) use canvas::scoped;
pub(crate) use layout::{Measured, TextBlock, draw, measure};
pub(crate) use paginate::Paginator;
pub(crate) use table::TableRun;

use canvas::StreamLedger;

fn rgb(c: Color) -> (f32, f32, f32) {
    (c[0] as f32 / 255.0, c[1] as f32 / 255.0, c[2] as f32 / 255.0)
}

struct PageBuffer {
    size: PageSize,
    /// Prepended chunks, oldest first; painted in reverse.
    under: Vec<Vec<u8>>,
    over: Vec<Vec<u8>>,
}

/// Canvas that serializes to PDF with `pdf-writer`.
pub struct PdfCanvas {
    pdf: Pdf,
    next_id: i32,
    fonts: FontBook,
    pages: Vec<PageBuffer>,
    ledger: StreamLedger,
    used_chars: BTreeMap<FontId, BTreeSet<char>>,
    images: Vec<(String, Ref)>,
    image_ids: HashMap<usize, ImageHandle>,
    /// Graphics states by opacity in thousandths.
    ext_states: BTreeMap<u16, (String, Ref)>,
}

impl Default for PdfCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfCanvas {
    pub fn new() -> Self {
        Self::with_fonts(FontBook::new())
    }

    pub fn with_fonts(fonts: FontBook) -> Self {
        Self {
            pdf: Pdf::new(),
            next_id: 1,
            fonts,
            pages: Vec::new(),
            ledger: StreamLedger::default(),
            used_chars: BTreeMap::new(),
            images: Vec::new(),
            image_ids: HashMap::new(),
            ext_states: BTreeMap::new(),
        }
    }

    fn alloc(&mut self) -> Ref {
        let r = Ref::new(self.next_id);
        self.next_id += 1;
        r
    }

    /// Resource name of the graphics state for `alpha`, written on first use.
    fn ext_state(&mut self, alpha: f32) -> String {
        let key = (alpha.clamp(0.0, 1.0) * 1000.0).round() as u16;
        if let Some((name, _)) = self.ext_states.get(&key) {
            return name.clone();
        }
        let state_ref = self.alloc();
        let alpha = f32::from(key) / 1000.0;
        self.pdf
            .ext_graphics(state_ref)
            .non_stroking_alpha(alpha)
            .stroking_alpha(alpha);
        let name = format!("Gs{}", self.ext_states.len() + 1);
        self.ext_states.insert(key, (name.clone(), state_ref));
        name
    }

    fn encode_stream(&mut self, stream: ContentStream) -> Vec<u8> {
        let reset = stream.reset_graphics();
        let mut content = Content::new();
        if reset {
            content.save_state();
        }
        for op in stream.into_ops() {
            match op {
                DrawOp::SetStroke { color, width } => {
                    let (r, g, b) = rgb(color);
                    content.set_stroke_rgb(r, g, b);
                    content.set_line_width(width);
                    content.set_line_cap(LineCapStyle::ButtCap);
                }
                DrawOp::MoveTo { x, y } => {
                    content.move_to(x, y);
                }
                DrawOp::LineTo { x, y } => {
                    content.line_to(x, y);
                }
                DrawOp::Stroke => {
                    content.stroke();
                }
                DrawOp::FillRect { rect, color } => {
                    let (r, g, b) = rgb(color);
                    content.save_state();
                    content.set_fill_rgb(r, g, b);
                    content.rect(rect.x, rect.y, rect.width, rect.height);
                    content.fill_nonzero();
                    content.restore_state();
                }
                DrawOp::SetOpacity { alpha } => {
                    let name = self.ext_state(alpha);
                    content.set_parameters(Name(name.as_bytes()));
                }
                DrawOp::Text {
                    font,
                    size,
                    x,
                    y,
                    angle,
                    text,
                    color,
                } => {
                    let entry = self.fonts.entry(font);
                    let bytes = entry.encode(&text);
                    self.used_chars.entry(font).or_default().extend(text.chars());
                    let (r, g, b) = rgb(color);
                    content.save_state();
                    content.set_fill_rgb(r, g, b);
                    let text_obj = content.begin_text();
                    text_obj.set_font(Name(entry.pdf_name.as_bytes()), size);
                    if angle == 0.0 {
                        text_obj.next_line(x, y);
                    } else {
                        let (sin, cos) = angle.to_radians().sin_cos();
                        text_obj.set_text_matrix([cos, sin, -sin, cos, x, y]);
                    }
                    text_obj.show(Str(&bytes)).end_text();
                    content.restore_state();
                }
                DrawOp::Image {
                    image,
                    x,
                    y,
                    width,
                    height,
                } => {
                    let Some((name, _)) = self.images.get(image.0) else {
                        log::warn!("unknown image handle {}", image.0);
                        continue;
                    };
                    content.save_state();
                    content.transform([width, 0.0, 0.0, height, x, y]);
                    content.x_object(Name(name.as_bytes()));
                    content.restore_state();
                }
            }
        }
        if reset {
            content.restore_state();
        }
        content.finish().as_slice().to_vec()
    }

    fn embed_image(&mut self, image: &ImageSource) -> Result<Ref> {
        let xobj_ref = self.alloc();
        match image.format {
            ImageFormat::Jpeg => {
                let decoded = image::load_from_memory_with_format(
                    &image.data,
                    image::ImageFormat::Jpeg,
                )?;
                let gray = decoded.color().channel_count() == 1;
                let mut xobj = self.pdf.image_xobject(xobj_ref, &image.data);
                xobj.filter(Filter::DctDecode);
                xobj.width(image.pixel_width as i32);
                xobj.height(image.pixel_height as i32);
                if gray {
                    xobj.color_space().device_gray();
                } else {
                    xobj.color_space().device_rgb();
                }
                xobj.bits_per_component(8);
            }
            ImageFormat::Png => {
                let decoded =
                    image::load_from_memory_with_format(&image.data, image::ImageFormat::Png)?;
                let rgba: image::RgbaImage = decoded.to_rgba8();
                let (w, h) = (rgba.width(), rgba.height());
                let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

                let rgb_data: Vec<u8> = rgba
                    .pixels()
                    .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
                    .collect();
                let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);

                let smask_ref = if has_alpha {
                    let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
                    let compressed_alpha =
                        miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6);
                    let mask_ref = self.alloc();
                    let mut mask = self.pdf.image_xobject(mask_ref, &compressed_alpha);
                    mask.filter(Filter::FlateDecode);
                    mask.width(w as i32);
                    mask.height(h as i32);
                    mask.color_space().device_gray();
                    mask.bits_per_component(8);
                    Some(mask_ref)
                } else {
                    None
                };

                let mut xobj = self.pdf.image_xobject(xobj_ref, &compressed_rgb);
                xobj.filter(Filter::FlateDecode);
                xobj.width(w as i32);
                xobj.height(h as i32);
                xobj.color_space().device_rgb();
                xobj.bits_per_component(8);
                if let Some(mask_ref) = smask_ref {
                    xobj.s_mask(mask_ref);
                }
            }
        }
        Ok(xobj_ref)
    }

    /// Write one font dictionary (and its descendants) for a font drawn with.
    fn write_font(&mut self, entry_id: FontId, font_ref: Ref) -> Result<()> {
        let chars = self.used_chars.get(&entry_id).cloned().unwrap_or_default();
        let entry: &FontEntry = self.fonts.entry(entry_id);
        match &entry.program {
            FontProgram::Builtin { base_font, .. } => {
                self.pdf
                    .type1_font(font_ref)
                    .base_font(Name(base_font.as_bytes()))
                    .encoding_predefined(Name(b"WinAnsiEncoding"));
            }
            FontProgram::TrueType {
                data,
                ps_name,
                bbox,
                ..
            } => {
                let font_data = data.as_ref();
                let data_len = i32::try_from(font_data.len())
                    .map_err(|_| Error::Font(format!("{ps_name}: font file too large")))?;
                let glyphs = entry.glyph_metrics(chars.iter().copied());
                if glyphs.len() < chars.len() {
                    log::warn!(
                        "{ps_name}: {} of {} characters have no glyph",
                        chars.len() - glyphs.len(),
                        chars.len()
                    );
                }
                let (ascent, descent, cap_height) = (
                    entry.ascender_ratio * 1000.0,
                    entry.descender_ratio * 1000.0,
                    entry.cap_height_ratio * 1000.0,
                );
                let ps_name = ps_name.clone();
                let bbox = PdfRect::new(bbox[0], bbox[1], bbox[2], bbox[3]);
                let font_data = font_data.to_vec();

                let descriptor_ref = self.alloc();
                let data_ref = self.alloc();
                let cid_font_ref = self.alloc();
                let tounicode_ref = self.alloc();

                self.pdf
                    .stream(data_ref, &font_data)
                    .pair(Name(b"Length1"), data_len);

                self.pdf
                    .font_descriptor(descriptor_ref)
                    .name(Name(ps_name.as_bytes()))
                    .flags(FontFlags::NON_SYMBOLIC)
                    .bbox(bbox)
                    .italic_angle(0.0)
                    .ascent(ascent)
                    .descent(descent)
                    .cap_height(cap_height)
                    .stem_v(80.0)
                    .font_file2(data_ref);

                let system_info = || SystemInfo {
                    registry: Str(b"Adobe"),
                    ordering: Str(b"Identity"),
                    supplement: 0,
                };
                {
                    let mut cid = self.pdf.cid_font(cid_font_ref);
                    cid.subtype(CidFontType::Type2);
                    cid.base_font(Name(ps_name.as_bytes()));
                    cid.system_info(system_info());
                    cid.font_descriptor(descriptor_ref);
                    cid.default_width(0.0);
                    cid.cid_to_gid_map_predefined(Name(b"Identity"));
                    let mut gid_widths: Vec<(u16, f32)> =
                        glyphs.iter().map(|&(_, gid, w)| (gid, w)).collect();
                    gid_widths.sort_by_key(|&(gid, _)| gid);
                    gid_widths.dedup_by_key(|&mut (gid, _)| gid);
                    if !gid_widths.is_empty() {
                        let mut w = cid.widths();
                        for &(gid, width) in &gid_widths {
                            w.consecutive(gid, [width]);
                        }
                    }
                }

                let cmap_name = format!("{ps_name}-UTF16");
                let mut cmap = UnicodeCmap::new(Name(cmap_name.as_bytes()), system_info());
                for &(ch, gid, _) in &glyphs {
                    cmap.pair(gid, ch);
                }
                let cmap_data = cmap.finish();
                self.pdf.stream(tounicode_ref, cmap_data.as_slice());

                self.pdf
                    .type0_font(font_ref)
                    .base_font(Name(ps_name.as_bytes()))
                    .encoding_predefined(Name(b"Identity-H"))
                    .descendant_font(cid_font_ref)
                    .to_unicode(tounicode_ref);
            }
        }
        Ok(())
    }
}

impl Canvas for PdfCanvas {
    type Output = Vec<u8>;

    fn begin_page(&mut self, size: PageSize) -> usize {
        self.pages.push(PageBuffer {
            size,
            under: Vec::new(),
            over: Vec::new(),
        });
        self.ledger.add_page()
    }

    fn open_stream(
        &mut self,
        page: usize,
        mode: StreamMode,
        reset_graphics: bool,
    ) -> Result<ContentStream> {
        self.ledger.acquire(page)?;
        Ok(ContentStream::new(page, mode, reset_graphics))
    }

    fn close_stream(&mut self, stream: ContentStream) -> Result<()> {
        let (page, mode) = (stream.page(), stream.mode());
        self.ledger.release(page)?;
        let bytes = self.encode_stream(stream);
        let buffer = self.pages.get_mut(page).ok_or(Error::NoSuchPage(page))?;
        match mode {
            StreamMode::Append => buffer.over.push(bytes),
            StreamMode::Prepend => buffer.under.push(bytes),
        }
        Ok(())
    }

    fn register_image(&mut self, image: &ImageSource) -> Result<ImageHandle> {
        let key = Arc::as_ptr(&image.data) as *const u8 as usize;
        if let Some(&handle) = self.image_ids.get(&key) {
            return Ok(handle);
        }
        let xobj_ref = self.embed_image(image)?;
        let handle = ImageHandle(self.images.len());
        self.images.push((format!("Im{}", handle.0 + 1), xobj_ref));
        self.image_ids.insert(key, handle);
        Ok(handle)
    }

    fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    fn fonts_mut(&mut self) -> &mut FontBook {
        &mut self.fonts
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        if let Some(page) = self.ledger.busy() {
            return Err(Error::StreamBusy(page));
        }
        let t0 = std::time::Instant::now();
        let catalog_id = self.alloc();
        let pages_id = self.alloc();

        let used: Vec<FontId> = self.used_chars.keys().copied().collect();
        let mut font_pairs: Vec<(String, Ref)> = Vec::with_capacity(used.len());
        for id in used {
            let font_ref = self.alloc();
            self.write_font(id, font_ref)?;
            font_pairs.push((self.fonts.entry(id).pdf_name.clone(), font_ref));
        }
        let t_fonts = t0.elapsed();

        let pages = std::mem::take(&mut self.pages);
        let n = pages.len();
        let page_ids: Vec<Ref> = (0..n).map(|_| self.alloc()).collect();
        let content_ids: Vec<Ref> = (0..n).map(|_| self.alloc()).collect();

        for (i, page) in pages.iter().enumerate() {
            let mut raw = Vec::new();
            for chunk in page.under.iter().rev().chain(page.over.iter()) {
                raw.extend_from_slice(chunk);
                raw.push(b'\n');
            }
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
            self.pdf
                .stream(content_ids[i], &compressed)
                .filter(Filter::FlateDecode);
        }

        self.pdf.catalog(catalog_id).pages(pages_id);
        self.pdf
            .pages(pages_id)
            .kids(page_ids.iter().copied())
            .count(n as i32);

        for (i, buffer) in pages.iter().enumerate() {
            let mut page = self.pdf.page(page_ids[i]);
            page.media_box(PdfRect::new(0.0, 0.0, buffer.size.width, buffer.size.height))
                .parent(pages_id)
                .contents(content_ids[i]);
            let mut resources = page.resources();
            if !font_pairs.is_empty() {
                let mut fonts = resources.fonts();
                for (name, font_ref) in &font_pairs {
                    fonts.pair(Name(name.as_bytes()), *font_ref);
                }
            }
            if !self.images.is_empty() {
                let mut xobjects = resources.x_objects();
                for (name, xobj_ref) in &self.images {
                    xobjects.pair(Name(name.as_bytes()), *xobj_ref);
                }
            }
            if !self.ext_states.is_empty() {
                let mut states = resources.ext_g_states();
                for (name, state_ref) in self.ext_states.values() {
                    states.pair(Name(name.as_bytes()), *state_ref);
                }
            }
        }
        let t_assembly = t0.elapsed();

        log::info!(
            "PDF phases: fonts={:.1}ms, assembly={:.1}ms ({} pages, {} images)",
            t_fonts.as_secs_f64() * 1000.0,
            (t_assembly - t_fonts).as_secs_f64() * 1000.0,
            n,
            self.images.len(),
        );

        Ok(self.pdf.finish())
    }
}

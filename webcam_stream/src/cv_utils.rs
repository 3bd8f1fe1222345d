use crate::overlay::Overlay;
use opencv::{
    core::{Mat, Point, Rect, Scalar, Vector},
    imgcodecs, imgproc,
};
use thiserror::Error;

const BOX_THICKNESS: i32 = 2;
const TEXT_SCALE: f64 = 1.0;
const TEXT_THICKNESS: i32 = 2;
const TEXT_PADDING: i32 = 4;
const COUNTER_ORIGIN: (i32, i32) = (10, 30);

#[derive(Error, Debug)]
pub enum CvUtilsError {
    #[error("Failed to encode frame: {0}")]
    EncodeFrameFailed(opencv::Error),
    #[error("Failed to annotate frame: {0}")]
    AnnotateFailed(opencv::Error),
}

fn black() -> Scalar {
    Scalar::new(0.0, 0.0, 0.0, 0.0)
}

pub struct CvImage {
    pub mat: Mat,
}

impl CvImage {
    pub fn new(mat: Mat) -> Self {
        Self { mat }
    }

    pub fn to_jpg(&self, quality: i32) -> Result<Vec<u8>, CvUtilsError> {
        let mut buf = Vector::<u8>::new();
        let params = Vector::<i32>::from_slice(&[imgcodecs::IMWRITE_JPEG_QUALITY, quality]);
        imgcodecs::imencode(".jpg", &self.mat, &mut buf, &params)
            .map_err(CvUtilsError::EncodeFrameFailed)?;
        Ok(buf.into())
    }

    pub fn annotate(&mut self, overlay: &Overlay) -> Result<&mut Self, CvUtilsError> {
        for bbox in &overlay.boxes {
            let x1 = bbox.x1 as i32;
            let y1 = bbox.y1 as i32;
            let x2 = bbox.x2 as i32;
            let y2 = bbox.y2 as i32;
            let color = Scalar::new(bbox.blue as f64, bbox.green as f64, bbox.red as f64, 0.0);

            imgproc::rectangle(
                &mut self.mat,
                Rect::new(x1, y1, x2.saturating_sub(x1), y2.saturating_sub(y1)),
                color,
                BOX_THICKNESS,
                imgproc::LINE_8,
                0,
            )
            .map_err(CvUtilsError::AnnotateFailed)?;

            self.draw_caption(&bbox.caption(), Point::new(x1, y1), color)?;
        }

        imgproc::put_text(
            &mut self.mat,
            &overlay.counter_text,
            Point::new(COUNTER_ORIGIN.0, COUNTER_ORIGIN.1),
            imgproc::FONT_HERSHEY_SIMPLEX,
            TEXT_SCALE,
            black(),
            TEXT_THICKNESS,
            imgproc::LINE_AA,
            false,
        )
        .map_err(CvUtilsError::AnnotateFailed)?;

        Ok(self)
    }

    // Caption sits on a filled strip in the box color above the top-left corner.
    fn draw_caption(
        &mut self,
        caption: &str,
        anchor: Point,
        color: Scalar,
    ) -> Result<(), CvUtilsError> {
        let mut baseline = 0;
        let text_size = imgproc::get_text_size(
            caption,
            imgproc::FONT_HERSHEY_SIMPLEX,
            TEXT_SCALE,
            TEXT_THICKNESS,
            &mut baseline,
        )
        .map_err(CvUtilsError::AnnotateFailed)?;

        let strip_height = text_size.height + baseline + 2 * TEXT_PADDING;
        let top = (anchor.y - strip_height).max(0);
        let strip = Rect::new(
            anchor.x,
            top,
            text_size.width + 2 * TEXT_PADDING,
            strip_height,
        );

        imgproc::rectangle(&mut self.mat, strip, color, imgproc::FILLED, imgproc::LINE_8, 0)
            .map_err(CvUtilsError::AnnotateFailed)?;

        imgproc::put_text(
            &mut self.mat,
            caption,
            Point::new(
                anchor.x.saturating_add(TEXT_PADDING),
                top + TEXT_PADDING + text_size.height,
            ),
            imgproc::FONT_HERSHEY_SIMPLEX,
            TEXT_SCALE,
            black(),
            TEXT_THICKNESS,
            imgproc::LINE_AA,
            false,
        )
        .map_err(CvUtilsError::AnnotateFailed)?;

        Ok(())
    }
}

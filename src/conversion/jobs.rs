use std::path::{Path, PathBuf};

use crate::io::Invocation;

/// Reprojection of a raw HDF5 mosaic into a cloud optimized GeoTIFF.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WarpJob {
    /// HDF5 file holding the mosaic.
    pub source: PathBuf,
    /// GeoTIFF to write.
    pub destination: PathBuf,
}

impl WarpJob {
    /// Target projection, web mercator.
    pub const TARGET_SRS: &'static str = "EPSG:3857";
    /// Output pixel size in meters.
    pub const RESOLUTION: u32 = 300;
    /// Value of pixels without data in the source.
    pub const SOURCE_NODATA: u32 = 65535;
    /// Subdataset of the rainfall values.
    const SUBDATASET: &'static str = "//dataset1/data1/data";

    /// Build the `gdalwarp` command line.
    pub fn to_invocation(&self) -> Invocation {
        let resolution = Self::RESOLUTION.to_string();

        Invocation::new("gdalwarp")
            .arg("-t_srs")
            .arg(Self::TARGET_SRS)
            .arg("-tr")
            .arg(resolution.as_str())
            .arg(resolution.as_str())
            .arg("-r")
            .arg("lanczos")
            .arg("-srcnodata")
            .arg(Self::SOURCE_NODATA.to_string())
            .arg("-co")
            .arg("COMPRESS=LZW")
            .arg("-co")
            .arg("PREDICTOR=YES")
            .arg("-of")
            .arg("COG")
            .arg("-overwrite")
            .arg(format!(
                "HDF5:\"{}\":{}",
                self.source.display(),
                Self::SUBDATASET
            ))
            .arg(path_arg(&self.destination))
    }
}

/// Colorization of a rainfall GeoTIFF with a palette.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorReliefJob {
    /// GeoTIFF holding rainfall values.
    pub source: PathBuf,
    /// Palette mapping values to colors.
    pub palette: PathBuf,
    /// RGBA GeoTIFF to write.
    pub destination: PathBuf,
}

impl ColorReliefJob {
    /// Build the `gdaldem color-relief` command line.
    pub fn to_invocation(&self) -> Invocation {
        Invocation::new("gdaldem")
            .arg("color-relief")
            .arg(path_arg(&self.source))
            .arg(path_arg(&self.palette))
            .arg(path_arg(&self.destination))
            .arg("-alpha")
            .arg("-nearest_color_entry")
            .arg("-co")
            .arg("COMPRESS=JPEG")
            .arg("-co")
            .arg("PREDICTOR=YES")
            .arg("-of")
            .arg("COG")
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn test_warp_command_line() {
        let job = WarpJob {
            source: PathBuf::from("/dev/shm/a.h5"),
            destination: PathBuf::from("/dev/shm/a.tif"),
        };

        assert_eq!(
            job.to_invocation().to_string(),
            "gdalwarp -t_srs EPSG:3857 -tr 300 300 -r lanczos -srcnodata 65535 -co COMPRESS=LZW \
             -co PREDICTOR=YES -of COG -overwrite HDF5:\"/dev/shm/a.h5\"://dataset1/data1/data \
             /dev/shm/a.tif"
        );
    }

    #[test]
    fn test_color_relief_command_line() {
        let job = ColorReliefJob {
            source: PathBuf::from("/dev/shm/a.tif"),
            palette: PathBuf::from("/palettes/p.pal"),
            destination: PathBuf::from("/dev/shm/b.tif"),
        };

        let invocation = job.to_invocation();
        assert_eq!(invocation.program, "gdaldem");
        assert_eq!(
            invocation.to_string(),
            "gdaldem color-relief /dev/shm/a.tif /palettes/p.pal /dev/shm/b.tif -alpha \
             -nearest_color_entry -co COMPRESS=JPEG -co PREDICTOR=YES -of COG"
        );
    }
}

/// Standard Vietnamese school periods, used when the image shows no clock
/// times.
const PERIODS: &[(&str, &str, &str)] = &[
    ("Sáng Tiết 1", "07:00", "07:45"),
    ("Sáng Tiết 2", "07:50", "08:35"),
    ("Sáng Tiết 3", "08:45", "09:30"),
    ("Sáng Tiết 4", "09:40", "10:25"),
    ("Sáng Tiết 5", "10:30", "11:15"),
    ("Chiều Tiết 1", "12:45", "13:30"),
    ("Chiều Tiết 2", "13:35", "14:20"),
    ("Chiều Tiết 3", "14:25", "15:10"),
    ("Chiều Tiết 4", "15:20", "16:05"),
];

/// Instructions sent alongside the image. `class_hint` names the class
/// column to read; blank means the first or fullest column.
pub fn build_prompt(class_hint: &str) -> String {
    let mut periods = String::new();
    for (name, start, end) in PERIODS {
        periods.push_str(&format!("   - {name}: {start} - {end}\n"));
    }
    format!(
        "Bạn đang xem ảnh Thời Khóa Biểu của một trường học Việt Nam.\n\
         Nhiệm vụ: trích xuất lịch học trong ảnh thành dữ liệu JSON.\n\
         \n\
         1. Lớp cần đọc: \"{hint}\". Nếu không thấy lớp này hoặc tên lớp để trống, \
         hãy đọc lớp đầu tiên hoặc cột có nhiều chữ nhất.\n\
         2. Đọc từng dòng và ghi lại tên môn học. Cột \"Thứ\" thường ở bên trái; \
         ô Thứ bị gộp áp dụng cho mọi tiết bên dưới.\n\
         3. Nếu ảnh không ghi giờ, dùng giờ chuẩn:\n\
         {periods}\
         4. Chỉ trả về MỘT mảng JSON, không giải thích, không Markdown:\n\
         [{{\"subject\": \"Toán\", \"day\": \"Thứ 2\", \"startTime\": \"07:00\", \"endTime\": \"07:45\"}}]\n",
        hint = class_hint.trim(),
    )
}
